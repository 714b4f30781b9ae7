// src/maintenance.rs
//
// Batch reconciliation over the whole lead set, run before analytics
// reads. Three independent sub-passes fan out on scoped threads and
// join before returning; their selection predicates are mutually
// exclusive by construction (see db::leads), so the passes never touch
// the same row. Each pass owns its own failures: a broken pass logs and
// contributes 0, the other two still run. Running the engine twice in a
// row changes nothing the second time.

use serde::Serialize;
use std::thread;
use std::time::Instant;

use crate::db::connection::Database;
use crate::db::{leads as db_leads, status_history};
use crate::db::status_history::ChangeSource;
use crate::domain::dates;
use crate::domain::lead::Lead;
use crate::domain::status::{schedule_follow_up, LeadStatus};
use crate::errors::ServerError;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub follow_up_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self { follow_up_days: 3 }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub promoted_to_follow_up: usize,
    pub synced_sales_status: usize,
    pub updated_activity_dates: usize,
    pub execution_time_ms: u64,
}

pub fn run_status_maintenance(
    db: &Database,
    cfg: &MaintenanceConfig,
) -> Result<MaintenanceReport, ServerError> {
    let started = Instant::now();
    let now = dates::now_canonical();

    let (promoted, synced, backfilled) = thread::scope(|s| {
        let promote = s.spawn(|| promote_stale_contacts(db, cfg, &now));
        let sync = s.spawn(|| sync_sales_status(db, &now));
        let backfill = s.spawn(|| backfill_activity_dates(db, cfg, &now));
        (
            join_pass("stale-contact promotion", promote),
            join_pass("sales/status sync", sync),
            join_pass("activity backfill", backfill),
        )
    });

    Ok(MaintenanceReport {
        promoted_to_follow_up: promoted,
        synced_sales_status: synced,
        updated_activity_dates: backfilled,
        execution_time_ms: started.elapsed().as_millis() as u64,
    })
}

fn join_pass(name: &str, handle: thread::ScopedJoinHandle<'_, Result<usize, ServerError>>) -> usize {
    match handle.join() {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            eprintln!("maintenance: {name} failed: {e}");
            0
        }
        Err(_) => {
            eprintln!("maintenance: {name} panicked");
            0
        }
    }
}

/// (a) Contacted leads with no activity for `follow_up_days` days are
/// advanced to Follow Up so they surface for review instead of silently
/// stalling the pipeline.
fn promote_stale_contacts(
    db: &Database,
    cfg: &MaintenanceConfig,
    now: &str,
) -> Result<usize, ServerError> {
    let cutoff = dates::add_days(now, -cfg.follow_up_days)?;
    let stale = db.with_conn(|conn| db_leads::stale_contacted(conn, &cutoff))?;

    let mut promoted = 0;
    for lead in stale {
        let next_follow_up = dates::add_business_days(now, 2)?;
        db.with_conn(|conn| {
            log_transition(
                conn,
                lead.id,
                lead.status,
                LeadStatus::FollowUp,
                now,
                &format!(
                    "auto-promoted: no activity for over {} days",
                    cfg.follow_up_days
                ),
            );
            db_leads::apply_follow_up_promotion(conn, lead.id, now, &next_follow_up)
        })?;
        promoted += 1;
    }
    Ok(promoted)
}

/// (b) Recorded sales are ground truth: any lead with sales but without
/// Closed Won gets corrected, even rows that bypassed the handlers
/// (direct imports).
fn sync_sales_status(db: &Database, now: &str) -> Result<usize, ServerError> {
    let unsynced = db.with_conn(|conn| db_leads::unsynced_sales(conn))?;

    let mut synced = 0;
    for lead in unsynced {
        let closed_month = dates::month_name(now);
        let closed_year = dates::year(now);
        db.with_conn(|conn| {
            log_transition(
                conn,
                lead.id,
                lead.status,
                LeadStatus::ClosedWon,
                now,
                &format!("sales of {:.2} recorded, status synced", lead.sales),
            );
            db_leads::apply_sales_sync(
                conn,
                lead.id,
                now,
                closed_month.as_deref(),
                closed_year.as_deref(),
            )
        })?;
        synced += 1;
    }
    Ok(synced)
}

/// (c) Backfill missing activity/follow-up dates. First non-null of
/// lastActivity/date/createdAt/now becomes the activity date; open
/// leads missing a follow-up get one from the status table; terminal
/// leads keep follow-up NULL. Only a real change counts.
fn backfill_activity_dates(
    db: &Database,
    cfg: &MaintenanceConfig,
    now: &str,
) -> Result<usize, ServerError> {
    let cutoff = dates::add_days(now, -cfg.follow_up_days)?;
    let missing = db.with_conn(|conn| db_leads::missing_dates(conn, &cutoff))?;

    let mut updated = 0;
    for lead in missing {
        let (last_activity, next_follow_up) = derive_backfill(&lead, cfg, now)?;

        let changed = lead.last_activity_date.as_deref() != Some(last_activity.as_str())
            || lead.next_follow_up_date != next_follow_up;
        if !changed {
            continue;
        }

        db.with_conn(|conn| {
            db_leads::apply_date_backfill(
                conn,
                lead.id,
                now,
                &last_activity,
                next_follow_up.as_deref(),
            )
        })?;
        updated += 1;
    }
    Ok(updated)
}

fn derive_backfill(
    lead: &Lead,
    cfg: &MaintenanceConfig,
    now: &str,
) -> Result<(String, Option<String>), ServerError> {
    let last_activity = lead
        .last_activity_date
        .clone()
        .or_else(|| lead.date.clone())
        .unwrap_or_else(|| {
            if lead.created_at.is_empty() {
                now.to_string()
            } else {
                lead.created_at.clone()
            }
        });

    let next_follow_up = if lead.status.is_closed() {
        None
    } else if lead.next_follow_up_date.is_none() {
        schedule_follow_up(lead.status, &last_activity, cfg.follow_up_days)?
    } else {
        lead.next_follow_up_date.clone()
    };

    Ok((last_activity, next_follow_up))
}

/// Ledger writes are advisory here exactly as in the handlers.
fn log_transition(
    conn: &rusqlite::Connection,
    lead_id: i64,
    from: LeadStatus,
    to: LeadStatus,
    now: &str,
    note: &str,
) {
    if let Err(e) = status_history::record_status_change(
        conn,
        lead_id,
        from,
        to,
        now,
        ChangeSource::Maintenance,
        None,
        Some(note),
    ) {
        eprintln!("status history write failed for lead {lead_id}: {e}");
    }
}
