use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::Value;

pub const MAX_LIST_ITEMS: usize = 100;
pub const MAX_ITEM_LEN: usize = 120;

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

/// Trimmed list of strings; items may be blank, the form keeps placeholder rows.
pub fn parse_string_list(
    v: &Value,
    key: &str,
    max_items: usize,
    max_len: usize,
) -> Result<Vec<String>, String> {
    let arr = v
        .as_array()
        .ok_or_else(|| format!("{} must be an array of strings", key))?;
    if arr.len() > max_items {
        return Err(format!("{} must have at most {} items", key, max_items));
    }
    arr.iter()
        .map(|item| parse_string_max(item, key, max_len))
        .collect()
}
