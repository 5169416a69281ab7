use crate::calendar::{build_calendar, skipped_assignments, Assignment};
use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::handlers::schedule::current_planning;
use crate::ipc::handlers::setup::load_week_layout;
use crate::ipc::helpers::{require_db, required_str};
use crate::ipc::types::{AppState, Request};
use crate::service::ScheduleResponse;
use crate::week::{DaySlot, WeekLayout};
use rusqlite::Connection;
use serde_json::json;

const SELECTED_GROUP_KEY: &str = "calendar.selectedGroup";

/// Stored selection if it still names a group, else the first group.
fn resolve_selected_group(conn: &Connection) -> Result<Option<String>, HandlerErr> {
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    let saved = db::settings_get_json(conn, SELECTED_GROUP_KEY)
        .map_err(HandlerErr::db_query)?
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .filter(|g| cfg.group_names.contains(g));
    Ok(saved.or_else(|| cfg.group_names.first().cloned()))
}

fn cell_item_json(layout: &WeekLayout, cell: DaySlot, a: &Assignment) -> serde_json::Value {
    let period = layout.period_number(cell).unwrap_or(0);
    json!({
        "group": a.group,
        "subject": a.subject,
        "teacher": a.teacher,
        "room": a.room,
        "period": a.period,
        "modality": a.modality,
        "inPerson": a.is_in_person(),
        "periodLabel": layout.period_label(period),
    })
}

fn calendar_select_group(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let group = required_str(req, "group")?.trim().to_string();
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    if !cfg.group_names.contains(&group) {
        return Err(HandlerErr::new("not_found", "group not found")
            .with_details(json!({ "group": group })));
    }
    db::settings_set_json(conn, SELECTED_GROUP_KEY, &json!(group))
        .map_err(HandlerErr::db_update)?;
    Ok(json!({ "group": group }))
}

fn calendar_build(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let group = match req.params.get("group").and_then(|v| v.as_str()) {
        Some(g) => g.trim().to_string(),
        None => resolve_selected_group(conn)?
            .ok_or_else(|| HandlerErr::new("not_found", "no group selected"))?,
    };
    if group.is_empty() {
        return Err(HandlerErr::bad_params("group must not be empty"));
    }

    let Some(current) = current_planning(conn)? else {
        return Err(HandlerErr::new("no_planning", "no schedule has been generated yet"));
    };
    let assignments = match current.response {
        ScheduleResponse::Assignments(items) => items,
        ScheduleResponse::Failure { error } => {
            return Err(HandlerErr::new("planning_failed", error)
                .with_details(json!({ "planningId": current.stored.id })));
        }
    };

    let layout = load_week_layout(conn).map_err(HandlerErr::db_query)?;
    let grid = build_calendar(&layout, &assignments, &group);
    let skipped = skipped_assignments(&layout, &assignments, &group);
    for s in &skipped {
        log::warn!(
            "calendar {}: record #{} skipped ({:?}): {}",
            group,
            s.index,
            s.period,
            s.reason
        );
    }

    let cells: Vec<Vec<Vec<serde_json::Value>>> = grid
        .days()
        .iter()
        .enumerate()
        .map(|(day, slots)| {
            slots
                .iter()
                .enumerate()
                .map(|(slot, items)| {
                    items
                        .iter()
                        .map(|a| cell_item_json(&layout, DaySlot { day, slot }, a))
                        .collect()
                })
                .collect()
        })
        .collect();

    Ok(json!({
        "group": group,
        "planningId": current.stored.id,
        "days": layout.days,
        "slots": layout.slots,
        "cells": cells,
        "assignmentCount": grid.assignment_count(),
        "skipped": skipped,
        "stale": current.stale,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "calendar.selectGroup" => calendar_select_group(state, req),
        "calendar.build" => calendar_build(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
