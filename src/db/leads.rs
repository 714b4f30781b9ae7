// src/db/leads.rs
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

use crate::domain::lead::Lead;
use crate::domain::status::LeadStatus;
use crate::errors::ServerError;

const LEAD_COLUMNS: &str = "id, name, phone, email, status, sales, \
     date, closed_date, closed_month, closed_year, last_activity_date, next_follow_up_date, \
     platform, platform_id, trainer_handle, trainer_id, notes, created_at, updated_at";

fn lead_from_row(row: &Row) -> rusqlite::Result<Lead> {
    // Status is normalized on the way out so rows written before the
    // canonical set existed can never leak free text.
    let raw_status: String = row.get(4)?;
    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        status: LeadStatus::normalize(Some(&raw_status)),
        sales: row.get(5)?,
        date: row.get(6)?,
        closed_date: row.get(7)?,
        closed_month: row.get(8)?,
        closed_year: row.get(9)?,
        last_activity_date: row.get(10)?,
        next_follow_up_date: row.get(11)?,
        platform: row.get(12)?,
        platform_id: row.get(13)?,
        trainer_handle: row.get(14)?,
        trainer_id: row.get(15)?,
        notes: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn collect_leads(
    rows: rusqlite::MappedRows<'_, impl FnMut(&Row) -> rusqlite::Result<Lead>>,
) -> Result<Vec<Lead>, ServerError> {
    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}

/// Insert a lead and return its assigned id (the `id` field on the
/// passed value is ignored).
pub fn insert_lead(conn: &Connection, lead: &Lead) -> Result<i64, ServerError> {
    conn.execute(
        "insert into leads (
            name, phone, email, status, sales,
            date, closed_date, closed_month, closed_year,
            last_activity_date, next_follow_up_date,
            platform, platform_id, trainer_handle, trainer_id,
            notes, created_at, updated_at
         ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            lead.name,
            lead.phone,
            lead.email,
            lead.status.as_str(),
            lead.sales,
            lead.date,
            lead.closed_date,
            lead.closed_month,
            lead.closed_year,
            lead.last_activity_date,
            lead.next_follow_up_date,
            lead.platform,
            lead.platform_id,
            lead.trainer_handle,
            lead.trainer_id,
            lead.notes,
            lead.created_at,
            lead.updated_at,
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert lead failed: {e}")))?;

    Ok(conn.last_insert_rowid())
}

pub fn get_lead(conn: &Connection, id: i64) -> Result<Option<Lead>, ServerError> {
    conn.query_row(
        &format!("select {LEAD_COLUMNS} from leads where id = ?"),
        params![id],
        lead_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select lead failed: {e}")))
}

pub fn list_leads(conn: &Connection) -> Result<Vec<Lead>, ServerError> {
    let mut stmt = conn
        .prepare(&format!("select {LEAD_COLUMNS} from leads order by id"))
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    let rows = stmt
        .query_map([], lead_from_row)
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    collect_leads(rows)
}

/// Full-row update by id, used by the mutation handlers.
pub fn update_lead(conn: &Connection, lead: &Lead) -> Result<(), ServerError> {
    let changed = conn
        .execute(
            "update leads set
                name = ?2, phone = ?3, email = ?4, status = ?5, sales = ?6,
                date = ?7, closed_date = ?8, closed_month = ?9, closed_year = ?10,
                last_activity_date = ?11, next_follow_up_date = ?12,
                platform = ?13, platform_id = ?14, trainer_handle = ?15, trainer_id = ?16,
                notes = ?17, updated_at = ?18
             where id = ?1",
            params![
                lead.id,
                lead.name,
                lead.phone,
                lead.email,
                lead.status.as_str(),
                lead.sales,
                lead.date,
                lead.closed_date,
                lead.closed_month,
                lead.closed_year,
                lead.last_activity_date,
                lead.next_follow_up_date,
                lead.platform,
                lead.platform_id,
                lead.trainer_handle,
                lead.trainer_id,
                lead.notes,
                lead.updated_at,
            ],
        )
        .map_err(|e| ServerError::DbError(format!("update lead failed: {e}")))?;

    if changed == 0 {
        return Err(ServerError::NotFound);
    }
    Ok(())
}

// ---- maintenance selections ----
//
// The three predicates below are mutually exclusive by construction, so
// the concurrent sub-passes can never race each other on a row:
// sales-contradicting rows belong to the sync pass alone, stale
// Contacted rows to the promotion pass alone, and the backfill pass
// takes what remains.

// `status in ('Contacted', 'No Reply')` style fragment covering every
// stored spelling of a status, so imported rows carrying a legacy alias
// are selected the same way the Rust side normalizes them.
fn status_spelled_in(status: LeadStatus) -> String {
    let quoted: Vec<String> = status
        .stored_spellings()
        .iter()
        .map(|s| format!("'{s}'"))
        .collect();
    format!("status in ({})", quoted.join(", "))
}

/// Contacted leads whose last activity predates `cutoff`. Rows with
/// recorded sales are left to the sales sync pass.
pub fn stale_contacted(conn: &Connection, cutoff: &str) -> Result<Vec<Lead>, ServerError> {
    let contacted = status_spelled_in(LeadStatus::Contacted);
    let mut stmt = conn
        .prepare(&format!(
            "select {LEAD_COLUMNS} from leads
             where {contacted}
               and sales <= 0
               and last_activity_date is not null
               and last_activity_date < ?"
        ))
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    let rows = stmt
        .query_map(params![cutoff], lead_from_row)
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    collect_leads(rows)
}

/// Leads whose recorded sales contradict their status.
pub fn unsynced_sales(conn: &Connection) -> Result<Vec<Lead>, ServerError> {
    let mut stmt = conn
        .prepare(&format!(
            "select {LEAD_COLUMNS} from leads
             where sales > 0 and status != 'Closed Won'"
        ))
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    let rows = stmt
        .query_map([], lead_from_row)
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    collect_leads(rows)
}

/// Leads missing an activity or follow-up date, minus the rows the
/// other two passes are about to rewrite anyway.
pub fn missing_dates(conn: &Connection, cutoff: &str) -> Result<Vec<Lead>, ServerError> {
    let contacted = status_spelled_in(LeadStatus::Contacted);
    let mut stmt = conn
        .prepare(&format!(
            "select {LEAD_COLUMNS} from leads
             where (last_activity_date is null or next_follow_up_date is null)
               and not (sales > 0 and status != 'Closed Won')
               and not ({contacted}
                        and sales <= 0
                        and last_activity_date is not null
                        and last_activity_date < ?1)"
        ))
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    let rows = stmt
        .query_map(params![cutoff], lead_from_row)
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    collect_leads(rows)
}

// ---- targeted maintenance updates ----

pub fn apply_follow_up_promotion(
    conn: &Connection,
    id: i64,
    now: &str,
    next_follow_up: &str,
) -> Result<(), ServerError> {
    conn.execute(
        "update leads set
            status = 'Follow Up',
            last_activity_date = ?2,
            next_follow_up_date = ?3,
            updated_at = ?2
         where id = ?1",
        params![id, now, next_follow_up],
    )
    .map_err(|e| ServerError::DbError(format!("promote lead failed: {e}")))?;
    Ok(())
}

pub fn apply_sales_sync(
    conn: &Connection,
    id: i64,
    now: &str,
    closed_month: Option<&str>,
    closed_year: Option<&str>,
) -> Result<(), ServerError> {
    conn.execute(
        "update leads set
            status = 'Closed Won',
            last_activity_date = ?2,
            closed_date = ?2,
            closed_month = ?3,
            closed_year = ?4,
            next_follow_up_date = null,
            updated_at = ?2
         where id = ?1",
        params![id, now, closed_month, closed_year],
    )
    .map_err(|e| ServerError::DbError(format!("sales sync failed: {e}")))?;
    Ok(())
}

pub fn apply_date_backfill(
    conn: &Connection,
    id: i64,
    now: &str,
    last_activity: &str,
    next_follow_up: Option<&str>,
) -> Result<(), ServerError> {
    conn.execute(
        "update leads set
            last_activity_date = ?3,
            next_follow_up_date = ?4,
            updated_at = ?2
         where id = ?1",
        params![id, now, last_activity, next_follow_up],
    )
    .map_err(|e| ServerError::DbError(format!("date backfill failed: {e}")))?;
    Ok(())
}

// ---- reporting helpers ----

pub fn lead_ids(conn: &Connection) -> Result<Vec<i64>, ServerError> {
    let mut stmt = conn
        .prepare("select id from leads order by id")
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}

/// Lead counts per canonical status. Grouping happens after
/// normalization so a legacy-alias row lands in its canonical bucket
/// instead of surfacing as its own.
pub fn status_counts(conn: &Connection) -> Result<Vec<(String, i64)>, ServerError> {
    let mut stmt = conn
        .prepare("select status, count(*) from leads group by status")
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut counts: BTreeMap<&'static str, i64> = BTreeMap::new();
    for r in rows {
        let (raw, n) = r.map_err(|e| ServerError::DbError(e.to_string()))?;
        *counts
            .entry(LeadStatus::normalize(Some(&raw)).as_str())
            .or_insert(0) += n;
    }
    Ok(counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}
