use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{parse_string_list, parse_string_max};
use crate::ipc::types::{AppState, Request};
use crate::service::{DEFAULT_SERVICE_URL, DEFAULT_TIMEOUT_MS, SERVICE_URL_ENV};
use crate::week::{WeekLayout, MAX_DAYS, MAX_SLOTS};
use serde_json::{json, Map, Value};

const MAX_NAME_LEN: usize = 40;

#[derive(Clone, Copy)]
enum SetupSection {
    Week,
    Service,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "week" => Some(Self::Week),
            "service" => Some(Self::Service),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Week => "setup.week",
            Self::Service => "setup.service",
        }
    }
}

fn default_service_url() -> String {
    std::env::var(SERVICE_URL_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Week => {
            serde_json::to_value(WeekLayout::default()).unwrap_or_else(|_| json!({}))
        }
        SetupSection::Service => json!({
            "url": default_service_url(),
            "timeoutMs": DEFAULT_TIMEOUT_MS
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_non_empty(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = parse_string_max(v, key, max_len)?;
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    Ok(s)
}

fn parse_slots(v: &Value) -> Result<Value, String> {
    let arr = v.as_array().ok_or("slots must be an array")?;
    if arr.is_empty() || arr.len() > MAX_SLOTS {
        return Err(format!("slots must have 1..={} entries", MAX_SLOTS));
    }
    let mut out = Vec::with_capacity(arr.len());
    for slot in arr {
        let obj = slot
            .as_object()
            .ok_or("each slot must be an object with label and time")?;
        let label = parse_non_empty(
            obj.get("label").unwrap_or(&Value::Null),
            "slot.label",
            MAX_NAME_LEN,
        )?;
        let time = match obj.get("time") {
            Some(t) => parse_string_max(t, "slot.time", MAX_NAME_LEN)?,
            None => String::new(),
        };
        out.push(json!({ "label": label, "time": time }));
    }
    Ok(Value::Array(out))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Week => match k.as_str() {
                "days" => {
                    let days = parse_string_list(v, k, MAX_DAYS, MAX_NAME_LEN)?;
                    if days.is_empty() || days.iter().any(|d| d.is_empty()) {
                        return Err(format!("days must have 1..={} non-empty names", MAX_DAYS));
                    }
                    obj.insert(k.clone(), json!(days));
                }
                "slots" => {
                    obj.insert(k.clone(), parse_slots(v)?);
                }
                "periodMarker" => {
                    obj.insert(k.clone(), Value::String(parse_non_empty(v, k, MAX_NAME_LEN)?));
                }
                _ => return Err(format!("unknown week field: {}", k)),
            },
            SetupSection::Service => match k.as_str() {
                "url" => {
                    let url = parse_non_empty(v, k, 300)?;
                    if !url.starts_with("http://") {
                        return Err("url must start with http://".into());
                    }
                    obj.insert(k.clone(), Value::String(url));
                }
                "timeoutMs" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1000, 120_000)?));
                }
                _ => return Err(format!("unknown service field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a bad historical value falls back to defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

pub fn load_week_layout(conn: &rusqlite::Connection) -> anyhow::Result<WeekLayout> {
    let value = load_section(conn, SetupSection::Week)?;
    let layout: WeekLayout = serde_json::from_value(value)?;
    if layout.validate().is_err() {
        return Ok(WeekLayout::default());
    }
    Ok(layout)
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub url: String,
    pub timeout_ms: u64,
}

pub fn load_service_settings(conn: &rusqlite::Connection) -> anyhow::Result<ServiceSettings> {
    let obj = load_section(conn, SetupSection::Service)?;
    let url = obj
        .get("url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(default_service_url);
    let timeout_ms = obj
        .get("timeoutMs")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    Ok(ServiceSettings { url, timeout_ms })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let week = match load_section(conn, SetupSection::Week) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let service = match load_section(conn, SetupSection::Service) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(&req.id, json!({ "week": week, "service": service }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    // Only explicitly set fields are stored so defaults (and the env URL) stay live.
    let mut saved = match db::settings_get_json(conn, section.key()) {
        Ok(Some(v)) if v.is_object() => v,
        Ok(_) => json!({}),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut saved, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &saved) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
