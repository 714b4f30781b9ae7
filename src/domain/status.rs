// src/domain/status.rs

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::domain::dates;
use crate::errors::ServerError;

/// The closed set of pipeline statuses, in pipeline order.
/// Free text only exists at the boundary; everything at rest is one of
/// these six values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    New,
    Contacted,
    FollowUp,
    Consulted,
    ClosedWon,
    ClosedLost,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::FollowUp => "Follow Up",
            LeadStatus::Consulted => "Consulted",
            LeadStatus::ClosedWon => "Closed Won",
            LeadStatus::ClosedLost => "Closed Lost",
        }
    }

    /// Map any historical or free-text status onto the canonical set.
    /// Total: unknown input falls back to New rather than erroring, so
    /// old imports can never poison the status column.
    pub fn normalize(raw: Option<&str>) -> LeadStatus {
        let raw = match raw {
            Some(s) => s.trim(),
            None => return LeadStatus::New,
        };
        match raw {
            "" => LeadStatus::New,
            "New" => LeadStatus::New,
            "Contacted" => LeadStatus::Contacted,
            "Follow Up" => LeadStatus::FollowUp,
            "Consulted" => LeadStatus::Consulted,
            "Closed Won" => LeadStatus::ClosedWon,
            "Closed Lost" => LeadStatus::ClosedLost,
            // legacy aliases from the old spreadsheet era
            "Consult" => LeadStatus::Consulted,
            "No Reply" => LeadStatus::Contacted,
            _ => LeadStatus::New,
        }
    }

    /// Every stored spelling that `normalize` maps onto this status,
    /// canonical form first. SQL predicates that select by status must
    /// use the full set or legacy-alias rows slip past them. New also
    /// absorbs arbitrary garbage, so its list covers the known
    /// spellings only.
    pub fn stored_spellings(self) -> &'static [&'static str] {
        match self {
            LeadStatus::New => &["New"],
            LeadStatus::Contacted => &["Contacted", "No Reply"],
            LeadStatus::FollowUp => &["Follow Up"],
            LeadStatus::Consulted => &["Consulted", "Consult"],
            LeadStatus::ClosedWon => &["Closed Won"],
            LeadStatus::ClosedLost => &["Closed Lost"],
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, LeadStatus::ClosedWon | LeadStatus::ClosedLost)
    }

    pub fn is_won(self) -> bool {
        self == LeadStatus::ClosedWon
    }

    /// Suggested next step in the pipeline, for the UI only. Direct
    /// jumps (e.g. New -> Closed Won on an immediate sale) stay legal.
    pub fn next(self) -> Option<LeadStatus> {
        match self {
            LeadStatus::New => Some(LeadStatus::Contacted),
            LeadStatus::Contacted => Some(LeadStatus::FollowUp),
            LeadStatus::FollowUp => Some(LeadStatus::Consulted),
            LeadStatus::Consulted => Some(LeadStatus::ClosedWon),
            LeadStatus::ClosedWon | LeadStatus::ClosedLost => None,
        }
    }
}

impl Serialize for LeadStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LeadStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(LeadStatus::normalize(Some(&raw)))
    }
}

/// The status rule cascade, applied identically by the mutation handlers
/// and the maintenance sales sync so the two call sites can't drift:
///
/// 1. an explicit requested status replaces the current one;
/// 2. recorded sales are ground truth, so sales > 0 forces Closed Won;
/// 3. a won lead whose sales just dropped to zero falls back to
///    Consulted instead of sitting on an inconsistent Closed Won.
pub fn derive_effective_status(
    current: LeadStatus,
    requested: Option<LeadStatus>,
    previous_sales: f64,
    sales: f64,
) -> LeadStatus {
    let mut status = requested.unwrap_or(current);
    if sales > 0.0 {
        status = LeadStatus::ClosedWon;
    }
    if sales <= 0.0 && previous_sales > 0.0 && status == LeadStatus::ClosedWon {
        status = LeadStatus::Consulted;
    }
    status
}

/// Status-keyed follow-up scheduling, shared by the mutation handlers
/// and the maintenance backfill. Terminal statuses never schedule a
/// follow-up (their `nextFollowUpDate` stays NULL).
pub fn schedule_follow_up(
    status: LeadStatus,
    base: &str,
    follow_up_days: i64,
) -> Result<Option<String>, ServerError> {
    let next = match status {
        LeadStatus::New | LeadStatus::Consulted => Some(dates::add_business_days(base, 1)?),
        LeadStatus::Contacted => Some(dates::add_days(base, follow_up_days)?),
        LeadStatus::FollowUp => Some(dates::add_business_days(base, 2)?),
        LeadStatus::ClosedWon | LeadStatus::ClosedLost => None,
    };
    Ok(next)
}
