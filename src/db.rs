use crate::config::ScheduleConfig;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

pub const DB_FILE: &str = "timetable.sqlite3";

const KIND_GROUP: &str = "group";
const KIND_ROOM: &str = "room";
const KIND_SUBJECT: &str = "subject";
const KIND_TEACHER: &str = "teacher";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS config_items(
            kind TEXT NOT NULL,
            idx INTEGER NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY(kind, idx)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teacher_specialties(
            teacher TEXT NOT NULL,
            subject TEXT NOT NULL,
            idx INTEGER NOT NULL,
            PRIMARY KEY(teacher, subject)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS plannings(
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            config_hash TEXT NOT NULL,
            status TEXT NOT NULL,
            response_json TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_plannings_created ON plannings(created_at)",
        [],
    )?;

    seed_default_config(&conn)?;

    Ok(conn)
}

// A fresh workspace starts from the stock example so the form is never blank.
fn seed_default_config(conn: &Connection) -> anyhow::Result<()> {
    let seeded: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = 'config.seeded'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    if seeded.is_some() {
        return Ok(());
    }
    save_config(conn, &ScheduleConfig::default())?;
    settings_set_json(conn, "config.seeded", &serde_json::Value::Bool(true))?;
    Ok(())
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

fn load_items(conn: &Connection, kind: &str) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT value FROM config_items WHERE kind = ? ORDER BY idx")?;
    let rows = stmt
        .query_map([kind], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn replace_items(conn: &Connection, kind: &str, items: &[String]) -> anyhow::Result<()> {
    conn.execute("DELETE FROM config_items WHERE kind = ?", [kind])?;
    for (i, v) in items.iter().enumerate() {
        conn.execute(
            "INSERT INTO config_items(kind, idx, value) VALUES(?, ?, ?)",
            (kind, i as i64, v),
        )?;
    }
    Ok(())
}

pub fn load_config(conn: &Connection) -> anyhow::Result<ScheduleConfig> {
    let mut specialties: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut stmt =
        conn.prepare("SELECT teacher, subject FROM teacher_specialties ORDER BY teacher, idx")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (teacher, subject) in rows {
        specialties.entry(teacher).or_default().push(subject);
    }

    let teachers = load_items(conn, KIND_TEACHER)?;
    for t in &teachers {
        specialties.entry(t.clone()).or_default();
    }

    Ok(ScheduleConfig {
        group_names: load_items(conn, KIND_GROUP)?,
        rooms: load_items(conn, KIND_ROOM)?,
        subjects: load_items(conn, KIND_SUBJECT)?,
        teachers,
        teacher_specialties: specialties,
    })
}

pub fn save_config(conn: &Connection, cfg: &ScheduleConfig) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    replace_items(&tx, KIND_GROUP, &cfg.group_names)?;
    replace_items(&tx, KIND_ROOM, &cfg.rooms)?;
    replace_items(&tx, KIND_SUBJECT, &cfg.subjects)?;
    replace_items(&tx, KIND_TEACHER, &cfg.teachers)?;

    tx.execute("DELETE FROM teacher_specialties", [])?;
    for (teacher, subjects) in &cfg.teacher_specialties {
        for (i, subject) in subjects.iter().enumerate() {
            tx.execute(
                "INSERT INTO teacher_specialties(teacher, subject, idx) VALUES(?, ?, ?)",
                (teacher, subject, i as i64),
            )?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StoredPlanning {
    pub id: String,
    pub created_at: String,
    pub config_hash: String,
    pub status: String,
    pub response: serde_json::Value,
}

pub fn insert_planning(conn: &Connection, p: &StoredPlanning) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO plannings(id, created_at, config_hash, status, response_json)
         VALUES(?, ?, ?, ?, ?)",
        (
            &p.id,
            &p.created_at,
            &p.config_hash,
            &p.status,
            p.response.to_string(),
        ),
    )?;
    Ok(())
}

pub fn latest_planning(conn: &Connection) -> anyhow::Result<Option<StoredPlanning>> {
    let row: Option<(String, String, String, String, String)> = conn
        .query_row(
            "SELECT id, created_at, config_hash, status, response_json
             FROM plannings
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .optional()?;
    let Some((id, created_at, config_hash, status, response_json)) = row else {
        return Ok(None);
    };
    Ok(Some(StoredPlanning {
        id,
        created_at,
        config_hash,
        status,
        response: serde_json::from_str(&response_json)?,
    }))
}
