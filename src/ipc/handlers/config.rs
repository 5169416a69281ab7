use crate::config::ScheduleConfig;
use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{
    parse_string_list, require_db, required_str, MAX_ITEM_LEN, MAX_LIST_ITEMS,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn config_json(cfg: &ScheduleConfig) -> serde_json::Value {
    json!({
        "groupNames": cfg.group_names,
        "rooms": cfg.rooms,
        "subjects": cfg.subjects,
        "teachers": cfg.teachers,
        "teacherSpecialties": cfg.teacher_specialties,
        "courseTypes": cfg.course_types(),
    })
}

fn config_get(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    Ok(config_json(&cfg))
}

fn config_update(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let patch = req
        .params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("patch must be an object"))?;

    let mut cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    for (k, v) in patch {
        let list = parse_string_list(v, k, MAX_LIST_ITEMS, MAX_ITEM_LEN)
            .map_err(HandlerErr::bad_params)?;
        match k.as_str() {
            "groupNames" => cfg.group_names = list,
            "rooms" => cfg.rooms = list,
            "subjects" => cfg.subjects = list,
            "teachers" => cfg.set_teachers(list),
            _ => return Err(HandlerErr::bad_params(format!("unknown config field: {}", k))),
        }
    }
    db::save_config(conn, &cfg).map_err(HandlerErr::db_update)?;
    Ok(config_json(&cfg))
}

#[derive(Clone, Copy)]
enum SpecialtyOp {
    Add,
    Remove,
    Toggle,
}

fn specialty_update(
    state: &AppState,
    req: &Request,
    op: SpecialtyOp,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let teacher = required_str(req, "teacher")?.trim().to_string();
    let subject = required_str(req, "subject")?.trim().to_string();
    if subject.is_empty() {
        return Err(HandlerErr::bad_params("subject must not be empty"));
    }

    let mut cfg = db::load_config(conn).map_err(HandlerErr::db_query)?;
    let changed = match op {
        SpecialtyOp::Add => cfg.add_specialty(&teacher, &subject),
        SpecialtyOp::Remove => cfg.remove_specialty(&teacher, &subject),
        SpecialtyOp::Toggle => cfg.toggle_specialty(&teacher, &subject).map(|_| ()),
    };
    changed.map_err(|msg| {
        HandlerErr::bad_params(msg).with_details(json!({ "teacher": teacher }))
    })?;
    db::save_config(conn, &cfg).map_err(HandlerErr::db_update)?;

    let specialties = cfg.specialties_of(&teacher);
    Ok(json!({
        "teacher": teacher,
        "specialties": specialties,
        "selected": specialties.iter().any(|s| *s == subject),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "config.get" => config_get(state),
        "config.update" => config_update(state, req),
        "specialties.add" => specialty_update(state, req, SpecialtyOp::Add),
        "specialties.remove" => specialty_update(state, req, SpecialtyOp::Remove),
        "specialties.toggle" => specialty_update(state, req, SpecialtyOp::Toggle),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
