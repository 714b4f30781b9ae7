// src/db/lookups.rs
//
// Platform/trainer references on a lead are denormalized: the row keeps
// both the foreign key and a free-text copy of the name/handle. These
// helpers resolve whatever the caller supplied: an explicit id wins,
// then a case-insensitive name/handle match, and as a last resort the
// free text is kept with no id.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::ServerError;

pub fn resolve_platform(
    conn: &Connection,
    id: Option<i64>,
    name: Option<&str>,
) -> Result<(Option<i64>, Option<String>), ServerError> {
    if let Some(id) = id {
        if let Some(canonical) = platform_name_by_id(conn, id)? {
            return Ok((Some(id), Some(canonical)));
        }
        // unknown id: fall through to whatever name was supplied
    }

    let Some(raw) = name.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok((None, None));
    };
    match platform_by_name(conn, raw)? {
        Some((id, canonical)) => Ok((Some(id), Some(canonical))),
        None => Ok((None, Some(raw.to_string()))),
    }
}

pub fn resolve_trainer(
    conn: &Connection,
    id: Option<i64>,
    handle: Option<&str>,
) -> Result<(Option<i64>, Option<String>), ServerError> {
    if let Some(id) = id {
        if let Some(canonical) = trainer_handle_by_id(conn, id)? {
            return Ok((Some(id), Some(canonical)));
        }
    }

    let Some(raw) = handle.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok((None, None));
    };
    match trainer_by_handle_or_name(conn, raw)? {
        Some((id, canonical)) => Ok((Some(id), Some(canonical))),
        None => Ok((None, Some(raw.to_string()))),
    }
}

fn platform_name_by_id(conn: &Connection, id: i64) -> Result<Option<String>, ServerError> {
    conn.query_row(
        "select name from platforms where id = ?",
        params![id],
        |r| r.get(0),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select platform failed: {e}")))
}

fn platform_by_name(conn: &Connection, name: &str) -> Result<Option<(i64, String)>, ServerError> {
    conn.query_row(
        "select id, name from platforms where lower(name) = lower(?)",
        params![name],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select platform by name failed: {e}")))
}

fn trainer_handle_by_id(conn: &Connection, id: i64) -> Result<Option<String>, ServerError> {
    conn.query_row(
        "select handle from trainers where id = ?",
        params![id],
        |r| r.get(0),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select trainer failed: {e}")))
}

fn trainer_by_handle_or_name(
    conn: &Connection,
    raw: &str,
) -> Result<Option<(i64, String)>, ServerError> {
    conn.query_row(
        "select id, handle from trainers
         where lower(handle) = lower(?1) or lower(name) = lower(?1)",
        params![raw],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select trainer by handle failed: {e}")))
}
