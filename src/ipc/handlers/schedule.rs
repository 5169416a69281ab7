use crate::db::{self, StoredPlanning};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::handlers::setup::{load_service_settings, load_week_layout};
use crate::ipc::helpers::require_db;
use crate::ipc::types::{AppState, Request};
use crate::service::{
    parse_schedule_response, HttpScheduleService, ScheduleResponse, ScheduleService,
};
use rusqlite::Connection;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

const STATUS_OK: &str = "ok";
const STATUS_FAILED: &str = "failed";

const GENERATE_FAILED_MESSAGE: &str =
    "unable to generate the schedule; check the data and try again";

pub struct CurrentPlanning {
    pub stored: StoredPlanning,
    pub response: ScheduleResponse,
    pub stale: bool,
}

/// Latest stored planning, with staleness measured against the current inputs.
pub fn current_planning(conn: &Connection) -> Result<Option<CurrentPlanning>, HandlerErr> {
    let Some(stored) = db::latest_planning(conn).map_err(HandlerErr::db_query)? else {
        return Ok(None);
    };
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    let layout = load_week_layout(conn).map_err(HandlerErr::db_query)?;
    let stale = stored.config_hash != cfg.fingerprint(&layout);
    let response = parse_schedule_response(&stored.response);
    Ok(Some(CurrentPlanning {
        stored,
        response,
        stale,
    }))
}

fn store_response(
    conn: &Connection,
    config_hash: String,
    response: serde_json::Value,
) -> Result<(StoredPlanning, ScheduleResponse), HandlerErr> {
    let parsed = parse_schedule_response(&response);
    let status = match parsed {
        ScheduleResponse::Assignments(_) => STATUS_OK,
        ScheduleResponse::Failure { .. } => STATUS_FAILED,
    };
    let stored = StoredPlanning {
        id: Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        config_hash,
        status: status.to_string(),
        response,
    };
    db::insert_planning(conn, &stored).map_err(HandlerErr::db_update)?;
    match &parsed {
        ScheduleResponse::Assignments(items) => {
            log::info!("planning {} stored with {} assignments", stored.id, items.len())
        }
        ScheduleResponse::Failure { error } => {
            log::warn!("planning {} failed: {}", stored.id, error)
        }
    }
    Ok((stored, parsed))
}

fn outcome_json(
    stored: &StoredPlanning,
    parsed: ScheduleResponse,
) -> Result<serde_json::Value, HandlerErr> {
    match parsed {
        ScheduleResponse::Assignments(items) => Ok(json!({
            "planningId": stored.id,
            "status": STATUS_OK,
            "assignmentCount": items.len(),
        })),
        ScheduleResponse::Failure { error } => Err(HandlerErr::new("schedule_failed", error)
            .with_details(json!({ "planningId": stored.id }))),
    }
}

fn schedule_payload(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    let layout = load_week_layout(conn).map_err(HandlerErr::db_query)?;
    serde_json::to_value(cfg.to_request(&layout))
        .map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn generate_with(
    conn: &Connection,
    service: &dyn ScheduleService,
) -> Result<serde_json::Value, HandlerErr> {
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    let layout = load_week_layout(conn).map_err(HandlerErr::db_query)?;
    let body = cfg.to_request(&layout);

    let response = service.request_schedule(&body).map_err(|e| {
        log::warn!("schedule request failed: {}", e);
        HandlerErr::new("service_unreachable", GENERATE_FAILED_MESSAGE)
            .with_details(json!({ "cause": e.to_string() }))
    })?;

    let (stored, parsed) = store_response(conn, cfg.fingerprint(&layout), response)?;
    outcome_json(&stored, parsed)
}

fn schedule_generate(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let settings = load_service_settings(conn).map_err(HandlerErr::db_query)?;
    log::info!("requesting schedule from {}", settings.url);
    let timeout = Duration::from_millis(settings.timeout_ms);
    let service = HttpScheduleService::new(settings.url, timeout);
    generate_with(conn, &service)
}

fn schedule_import(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(response) = req.params.get("response") else {
        return Err(HandlerErr::bad_params("missing response"));
    };
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    let layout = load_week_layout(conn).map_err(HandlerErr::db_query)?;
    let (stored, parsed) = store_response(conn, cfg.fingerprint(&layout), response.clone())?;
    outcome_json(&stored, parsed)
}

fn schedule_get(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(current) = current_planning(conn)? else {
        return Ok(json!({ "planning": null }));
    };
    let mut planning = json!({
        "planningId": current.stored.id,
        "createdAt": current.stored.created_at,
        "status": current.stored.status,
        "stale": current.stale,
    });
    match current.response {
        ScheduleResponse::Assignments(items) => planning["assignments"] = json!(items),
        ScheduleResponse::Failure { error } => planning["error"] = json!(error),
    }
    Ok(json!({ "planning": planning }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "schedule.payload" => schedule_payload(state),
        "schedule.generate" => schedule_generate(state),
        "schedule.import" => schedule_import(state, req),
        "schedule.get" => schedule_get(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
