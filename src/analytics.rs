// src/analytics.rs
//
// Funnel reporting over the ledger. Maintenance always runs first so
// the numbers are computed from rows that satisfy the invariants;
// a maintenance failure surfaces to the caller as a whole, per the
// "possibly-stale data" contract.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::db::connection::Database;
use crate::db::{leads as db_leads, status_history};
use crate::errors::ServerError;
use crate::maintenance::{run_status_maintenance, MaintenanceConfig, MaintenanceReport};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub maintenance: MaintenanceReport,
    /// Leads currently sitting in each status.
    pub status_counts: Vec<StatusCount>,
    /// Distinct leads that ever reached each status, reconstructed from
    /// the transition ledger.
    pub reached_counts: Vec<StatusCount>,
    /// Sum of sales across won leads.
    pub won_revenue: f64,
}

pub fn funnel_report(db: &Database, cfg: &MaintenanceConfig) -> Result<FunnelReport, ServerError> {
    let maintenance = run_status_maintenance(db, cfg)?;

    db.with_conn(|conn| {
        let status_counts = db_leads::status_counts(conn)?
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();

        let won_revenue = db_leads::list_leads(conn)?
            .iter()
            .filter(|l| l.status.is_won())
            .map(|l| l.sales)
            .sum();

        let ids = db_leads::lead_ids(conn)?;
        let transitions = status_history::transitions_for_leads(conn, &ids, None)?;

        let mut reached: BTreeMap<&'static str, HashSet<i64>> = BTreeMap::new();
        for t in &transitions {
            reached.entry(t.to_status.as_str()).or_default().insert(t.lead_id);
        }
        let reached_counts = reached
            .into_iter()
            .map(|(status, leads)| StatusCount {
                status: status.to_string(),
                count: leads.len() as i64,
            })
            .collect();

        Ok(FunnelReport {
            maintenance,
            status_counts,
            reached_counts,
            won_revenue,
        })
    })
}
