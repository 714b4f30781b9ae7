// src/db/status_history.rs
//
// Append-only ledger of status transitions. Rows are never updated or
// deleted; the funnel report reconstructs conversion numbers from them.
// Writes here are advisory: callers log failures and carry on with the
// lead mutation, because a lost history row only degrades reporting
// while a lost lead update loses real data.

use chrono::Duration;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::domain::dates;
use crate::domain::status::LeadStatus;
use crate::errors::ServerError;

/// Who observed the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Api,
    Maintenance,
}

impl ChangeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeSource::Api => "api",
            ChangeSource::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionRow {
    pub lead_id: i64,
    pub to_status: LeadStatus,
    pub changed_at: String,
}

/// Retried or concurrent writes can observe the same semantic transition
/// twice within seconds; anything inside this window is one event.
pub const DEDUP_WINDOW_SECS: i64 = 60;

/// SQLite caps query parameters; keep id batches comfortably under it.
const MAX_IDS_PER_QUERY: usize = 90;

/// Record one observed transition. No-ops when nothing actually changed
/// (`from == to`) or when an identical transition was already recorded
/// inside the dedup window.
pub fn record_status_change(
    conn: &Connection,
    lead_id: i64,
    from: LeadStatus,
    to: LeadStatus,
    changed_at: &str,
    source: ChangeSource,
    changed_by: Option<&str>,
    note: Option<&str>,
) -> Result<(), ServerError> {
    if from == to {
        return Ok(());
    }
    if !ensure_single_transition(conn, lead_id, to, changed_at, DEDUP_WINDOW_SECS)? {
        return Ok(());
    }

    conn.execute(
        "insert into lead_status_history
            (lead_id, from_status, to_status, changed_at, source, changed_by, note)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            lead_id,
            from.as_str(),
            to.as_str(),
            changed_at,
            source.as_str(),
            changed_by,
            note,
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert status history failed: {e}")))?;
    Ok(())
}

/// True when no entry with the same lead and target status exists within
/// `window_secs` of `changed_at`, i.e. the transition is safe to record.
pub fn ensure_single_transition(
    conn: &Connection,
    lead_id: i64,
    to: LeadStatus,
    changed_at: &str,
    window_secs: i64,
) -> Result<bool, ServerError> {
    let at = dates::parse_canonical(changed_at)?;
    let lo = (at - Duration::seconds(window_secs)).to_rfc3339();
    let hi = (at + Duration::seconds(window_secs)).to_rfc3339();

    let duplicates: i64 = conn
        .query_row(
            "select count(*) from lead_status_history
             where lead_id = ?1 and to_status = ?2
               and changed_at >= ?3 and changed_at <= ?4",
            params![lead_id, to.as_str(), lo, hi],
            |row| row.get(0),
        )
        .map_err(|e| ServerError::DbError(format!("dedup lookup failed: {e}")))?;

    Ok(duplicates == 0)
}

/// All `(lead, to_status, changed_at)` triples for the given leads,
/// optionally restricted to a closed `changed_at` window. Ids are
/// chunked so a large lead set never exceeds the parameter limit.
pub fn transitions_for_leads(
    conn: &Connection,
    lead_ids: &[i64],
    window: Option<(&str, &str)>,
) -> Result<Vec<TransitionRow>, ServerError> {
    let mut out = Vec::new();

    for chunk in lead_ids.chunks(MAX_IDS_PER_QUERY) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let mut sql = format!(
            "select lead_id, to_status, changed_at from lead_status_history
             where lead_id in ({placeholders})"
        );

        let mut bind: Vec<Value> = chunk.iter().map(|id| Value::Integer(*id)).collect();
        if let Some((from_ts, to_ts)) = window {
            sql.push_str(" and changed_at >= ? and changed_at <= ?");
            bind.push(Value::Text(from_ts.to_string()));
            bind.push(Value::Text(to_ts.to_string()));
        }
        sql.push_str(" order by changed_at");

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                let raw_status: String = row.get(1)?;
                Ok(TransitionRow {
                    lead_id: row.get(0)?,
                    to_status: LeadStatus::normalize(Some(&raw_status)),
                    changed_at: row.get(2)?,
                })
            })
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
    }

    Ok(out)
}
