// src/leads/mutations.rs
use rusqlite::Connection;

use crate::db::connection::Database;
use crate::db::{leads as db_leads, lookups, status_history};
use crate::domain::dates;
use crate::domain::lead::{Lead, LeadPatch, NewLead};
use crate::domain::status::{derive_effective_status, schedule_follow_up, LeadStatus};
use crate::errors::ServerError;

#[derive(Debug, Clone)]
pub struct LeadServiceConfig {
    /// Days a Contacted lead may sit without activity before maintenance
    /// promotes it; also the Contacted follow-up offset on writes.
    pub follow_up_days: i64,
}

impl Default for LeadServiceConfig {
    fn default() -> Self {
        Self { follow_up_days: 3 }
    }
}

impl LeadServiceConfig {
    /// Reads FOLLOW_UP_DAYS from the environment, keeping the default
    /// when unset or unparsable.
    pub fn from_env() -> Self {
        let follow_up_days = std::env::var("FOLLOW_UP_DAYS")
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(3);
        Self { follow_up_days }
    }
}

pub struct LeadService {
    cfg: LeadServiceConfig,
}

impl LeadService {
    pub fn new(cfg: LeadServiceConfig) -> Self {
        Self { cfg }
    }

    pub fn follow_up_days(&self) -> i64 {
        self.cfg.follow_up_days
    }

    /// Create a lead. Name is the only required field; everything else
    /// is derived: sales > 0 forces Closed Won no matter what status was
    /// requested, terminal statuses get closed-date fields and no
    /// follow-up, everything else gets a follow-up per the status table.
    pub fn create_lead(&self, db: &Database, input: NewLead, now: &str) -> Result<Lead, ServerError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServerError::BadRequest("name is required".into()));
        }

        let date = match input.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => dates::display_date_to_canonical(raw).ok_or_else(|| {
                ServerError::BadRequest(format!("invalid date '{raw}', expected DD/MM/YYYY"))
            })?,
            None => now.to_string(),
        };

        let sales = input.sales.unwrap_or(0.0);
        let requested = input
            .status
            .as_deref()
            .map(|s| LeadStatus::normalize(Some(s)));
        let status = derive_effective_status(LeadStatus::New, requested, 0.0, sales);

        db.with_conn(|conn| {
            let (platform_id, platform) =
                lookups::resolve_platform(conn, input.platform_id, input.platform.as_deref())?;
            let (trainer_id, trainer_handle) =
                lookups::resolve_trainer(conn, input.trainer_id, input.trainer_handle.as_deref())?;

            let mut lead = Lead {
                id: 0,
                name: name.clone(),
                phone: input.phone.clone(),
                email: input.email.clone(),
                status,
                sales,
                date: Some(date.clone()),
                closed_date: None,
                closed_month: None,
                closed_year: None,
                last_activity_date: Some(now.to_string()),
                next_follow_up_date: None,
                platform,
                platform_id,
                trainer_handle,
                trainer_id,
                notes: input.notes.clone(),
                created_at: now.to_string(),
                updated_at: now.to_string(),
            };

            if status.is_closed() {
                stamp_closed(&mut lead, date.clone());
            } else {
                lead.next_follow_up_date =
                    schedule_follow_up(status, now, self.cfg.follow_up_days)?;
            }

            lead.id = db_leads::insert_lead(conn, &lead)?;

            log_transition(conn, lead.id, LeadStatus::New, status, now, None);
            Ok(lead)
        })
    }

    /// Partial update. Fields absent from the patch keep their current
    /// value; the effective status is re-derived from the layered input
    /// and the row is corrected to satisfy the resting invariants. The
    /// returned row is authoritative; it may differ from the request.
    pub fn update_lead(
        &self,
        db: &Database,
        id: i64,
        patch: LeadPatch,
        now: &str,
    ) -> Result<Lead, ServerError> {
        db.with_conn(|conn| {
            let mut lead = db_leads::get_lead(conn, id)?.ok_or(ServerError::NotFound)?;
            let previous_status = lead.status;
            let previous_sales = lead.sales;

            if let Some(name) = patch.name.as_deref() {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ServerError::BadRequest("name cannot be empty".into()));
                }
                lead.name = name.to_string();
            }
            if patch.phone.is_some() {
                lead.phone = patch.phone.clone();
            }
            if patch.email.is_some() {
                lead.email = patch.email.clone();
            }
            if patch.notes.is_some() {
                lead.notes = patch.notes.clone();
            }
            if patch.platform_id.is_some() || patch.platform.is_some() {
                let (platform_id, platform) =
                    lookups::resolve_platform(conn, patch.platform_id, patch.platform.as_deref())?;
                lead.platform_id = platform_id;
                lead.platform = platform;
            }
            if patch.trainer_id.is_some() || patch.trainer_handle.is_some() {
                let (trainer_id, trainer_handle) =
                    lookups::resolve_trainer(conn, patch.trainer_id, patch.trainer_handle.as_deref())?;
                lead.trainer_id = trainer_id;
                lead.trainer_handle = trainer_handle;
            }
            if let Some(raw) = patch.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                lead.date = Some(dates::display_date_to_canonical(raw).ok_or_else(|| {
                    ServerError::BadRequest(format!("invalid date '{raw}', expected DD/MM/YYYY"))
                })?);
            }

            lead.sales = patch.sales.unwrap_or(previous_sales);
            let requested = patch
                .status
                .as_deref()
                .map(|s| LeadStatus::normalize(Some(s)));
            let status =
                derive_effective_status(previous_status, requested, previous_sales, lead.sales);

            if status != previous_status {
                lead.status = status;
                lead.last_activity_date = Some(now.to_string());

                if status.is_closed() {
                    let closed = match patch
                        .closed_date
                        .as_deref()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                    {
                        Some(raw) => dates::display_date_to_canonical(raw).ok_or_else(|| {
                            ServerError::BadRequest(format!(
                                "invalid closedDate '{raw}', expected DD/MM/YYYY"
                            ))
                        })?,
                        None => lead
                            .closed_date
                            .clone()
                            .or_else(|| lead.date.clone())
                            .unwrap_or_else(|| now.to_string()),
                    };
                    stamp_closed(&mut lead, closed);
                } else {
                    lead.closed_date = None;
                    lead.closed_month = None;
                    lead.closed_year = None;
                    lead.next_follow_up_date =
                        schedule_follow_up(status, now, self.cfg.follow_up_days)?;
                }
            }

            lead.updated_at = now.to_string();
            db_leads::update_lead(conn, &lead)?;

            log_transition(conn, id, previous_status, status, now, None);
            Ok(lead)
        })
    }
}

/// Terminal statuses carry a complete closed-date triple and never a
/// follow-up.
fn stamp_closed(lead: &mut Lead, closed: String) {
    lead.closed_month = dates::month_name(&closed);
    lead.closed_year = dates::year(&closed);
    lead.closed_date = Some(closed);
    lead.next_follow_up_date = None;
}

/// Best-effort ledger write: a failed history row must never fail the
/// lead mutation it describes.
fn log_transition(
    conn: &Connection,
    lead_id: i64,
    from: LeadStatus,
    to: LeadStatus,
    now: &str,
    changed_by: Option<&str>,
) {
    if let Err(e) = status_history::record_status_change(
        conn,
        lead_id,
        from,
        to,
        now,
        status_history::ChangeSource::Api,
        changed_by,
        None,
    ) {
        eprintln!("status history write failed for lead {lead_id}: {e}");
    }
}
