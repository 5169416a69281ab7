pub mod calendar;
pub mod config;
pub mod core;
pub mod schedule;
pub mod setup;
