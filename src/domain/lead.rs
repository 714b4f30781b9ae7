// src/domain/lead.rs

use serde::{Deserialize, Serialize};

use crate::domain::status::LeadStatus;

/// One sales prospect as persisted. All timestamps are canonical +08:00
/// strings (see domain::dates); `date` is when the lead arrived.
///
/// Invariants held at rest, enforced by the handlers and the
/// maintenance engine rather than by rejecting writes:
/// - sales > 0 implies status == Closed Won
/// - terminal status iff next_follow_up_date is NULL
/// - terminal status iff closed_date/closed_month/closed_year are set
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,

    pub status: LeadStatus,
    pub sales: f64,

    pub date: Option<String>,
    pub closed_date: Option<String>,
    pub closed_month: Option<String>,
    pub closed_year: Option<String>,
    pub last_activity_date: Option<String>,
    pub next_follow_up_date: Option<String>,

    pub platform: Option<String>,
    pub platform_id: Option<i64>,
    pub trainer_handle: Option<String>,
    pub trainer_id: Option<i64>,

    pub notes: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

/// Create request body. Only `name` is required; `status` stays a raw
/// string here and is normalized at the handler boundary, `date` is the
/// DD/MM/YYYY display form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLead {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub sales: Option<f64>,
    pub date: Option<String>,
    pub platform_id: Option<i64>,
    pub platform: Option<String>,
    pub trainer_id: Option<i64>,
    pub trainer_handle: Option<String>,
    pub notes: Option<String>,
}

/// Partial update request body: absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub sales: Option<f64>,
    pub date: Option<String>,
    /// Explicit close date (DD/MM/YYYY), honored when the update lands
    /// the lead on a terminal status.
    pub closed_date: Option<String>,
    pub platform_id: Option<i64>,
    pub platform: Option<String>,
    pub trainer_id: Option<i64>,
    pub trainer_handle: Option<String>,
    pub notes: Option<String>,
}
