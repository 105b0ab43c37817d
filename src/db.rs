use std::str::FromStr;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::entity::{Effort, Entity};
use crate::domain::entity_class::EntityClass;
use crate::domain::state::StateId;

pub const CURRENT_SCHEMA_VERSION: i64 = 2;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "baseline_entity_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entity (
    id TEXT PRIMARY KEY,
    class TEXT NOT NULL,
    parent_id TEXT,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    estimated_hours REAL,
    actual_hours REAL,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entity_parent_id ON entity(parent_id);
CREATE INDEX IF NOT EXISTS idx_entity_class ON entity(class);
"#,
    },
    Migration {
        version: 2,
        name: "state_set_overrides_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS state_set_override (
    class TEXT PRIMARY KEY,
    body_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
    },
];

const ENTITY_COLUMNS: &str = "id, class, parent_id, title, status, estimated_hours, \
     actual_hours, completed_at, created_at, updated_at";

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let applied_at = format_timestamp(OffsetDateTime::now_utc())?;
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tracing::debug!(version = migration.version, name = migration.name, "applying migration");
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, applied_at],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn format_timestamp(value: OffsetDateTime) -> Result<String> {
    value
        .format(&Rfc3339)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn parse_timestamp(index: usize, raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn entity_from_row(row: &Row<'_>) -> Result<Entity> {
    let class_raw: String = row.get(1)?;
    let class = EntityClass::from_str(&class_raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err)))?;
    let status_raw: String = row.get(4)?;
    let status = StateId::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            "empty status for entity row".into(),
        )
    })?;
    let estimated: Option<f64> = row.get(5)?;
    let actual: Option<f64> = row.get(6)?;
    let completed_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Entity {
        id: row.get(0)?,
        class,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        status,
        effort: estimated.map(|estimated| Effort {
            estimated,
            actual: actual.unwrap_or(0.0),
        }),
        completed_at: completed_at
            .as_deref()
            .map(|raw| parse_timestamp(7, raw))
            .transpose()?,
        created_at: parse_timestamp(8, &created_at)?,
        updated_at: parse_timestamp(9, &updated_at)?,
    })
}

pub fn upsert_entity(conn: &Connection, entity: &Entity) -> Result<()> {
    let completed_at = entity.completed_at.map(format_timestamp).transpose()?;
    conn.execute(
        r#"
INSERT INTO entity (
    id, class, parent_id, title, status, estimated_hours, actual_hours,
    completed_at, created_at, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT(id) DO UPDATE SET
    class = excluded.class,
    parent_id = excluded.parent_id,
    title = excluded.title,
    status = excluded.status,
    estimated_hours = excluded.estimated_hours,
    actual_hours = excluded.actual_hours,
    completed_at = excluded.completed_at,
    created_at = COALESCE(entity.created_at, excluded.created_at),
    updated_at = excluded.updated_at
"#,
        params![
            entity.id,
            entity.class.as_str(),
            entity.parent_id,
            entity.title,
            entity.status.to_string(),
            entity.effort.map(|effort| effort.estimated),
            entity.effort.map(|effort| effort.actual),
            completed_at,
            format_timestamp(entity.created_at)?,
            format_timestamp(entity.updated_at)?,
        ],
    )?;
    Ok(())
}

pub fn get_entity(conn: &Connection, id: &str) -> Result<Option<Entity>> {
    conn.query_row(
        &format!("SELECT {ENTITY_COLUMNS} FROM entity WHERE id = ?1"),
        params![id],
        entity_from_row,
    )
    .optional()
}

pub fn entity_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entity WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub fn list_entities(conn: &Connection) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entity ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], entity_from_row)?;
    rows.collect()
}

pub fn list_children(conn: &Connection, parent_id: &str) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entity WHERE parent_id = ?1 ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![parent_id], entity_from_row)?;
    rows.collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSetOverrideRecord {
    pub class: String,
    pub body_json: String,
    pub updated_at: String,
}

pub fn list_state_set_overrides(conn: &Connection) -> Result<Vec<StateSetOverrideRecord>> {
    let mut stmt = conn.prepare(
        "SELECT class, body_json, updated_at FROM state_set_override ORDER BY class ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(StateSetOverrideRecord {
            class: row.get(0)?,
            body_json: row.get(1)?,
            updated_at: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn put_state_set_override(
    conn: &Connection,
    class: EntityClass,
    body_json: &str,
    updated_at: OffsetDateTime,
) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO state_set_override (class, body_json, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(class) DO UPDATE SET
    body_json = excluded.body_json,
    updated_at = excluded.updated_at
"#,
        params![class.as_str(), body_json, format_timestamp(updated_at)?],
    )?;
    Ok(())
}

pub fn delete_state_set_override(conn: &Connection, class: EntityClass) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM state_set_override WHERE class = ?1",
        params![class.as_str()],
    )?;
    Ok(removed > 0)
}
