// src/tests/router_tests/analytics_tests.rs

use crate::domain::dates;
use crate::errors::ServerError;
use crate::leads::{LeadService, LeadServiceConfig};
use crate::router::handle;
use crate::tests::utils::{empty_request, json_body, make_db};
use http::Method;
use rusqlite::params;

fn svc() -> LeadService {
    LeadService::new(LeadServiceConfig::default())
}

#[test]
fn maintenance_endpoint_reports_zeros_on_empty_db() {
    let db = make_db("route_maint_empty");
    let mut resp = handle(
        empty_request(Method::POST, "/maintenance/run"),
        &db,
        &svc(),
    )
    .unwrap();
    assert_eq!(resp.status(), 200);

    let report = json_body(&mut resp);
    assert_eq!(report["promotedToFollowUp"], 0);
    assert_eq!(report["syncedSalesStatus"], 0);
    assert_eq!(report["updatedActivityDates"], 0);
    assert!(report["executionTimeMs"].is_number());
}

#[test]
fn funnel_buckets_legacy_aliases_under_canonical_statuses() {
    let db = make_db("route_funnel_alias");

    // two imported rows still carrying spreadsheet-era spellings, both
    // recently active so no maintenance pass rewrites them
    db.with_conn(|conn| {
        conn.execute(
            "insert into leads
                (name, status, sales, last_activity_date, next_follow_up_date,
                 created_at, updated_at)
             values
                ('Quiet', 'No Reply', 0.0, ?1, ?2, ?1, ?1),
                ('Seen', 'Consult', 0.0, ?1, ?2, ?1, ?1)",
            params![
                dates::now_canonical(),
                dates::add_days(&dates::now_canonical(), 3)?,
            ],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
    .unwrap();

    let mut resp = handle(
        empty_request(Method::GET, "/analytics/funnel"),
        &db,
        &svc(),
    )
    .unwrap();
    assert_eq!(resp.status(), 200);

    let report = json_body(&mut resp);
    let status_counts = report["statusCounts"].as_array().unwrap();
    assert!(status_counts
        .iter()
        .any(|c| c["status"] == "Contacted" && c["count"] == 1));
    assert!(status_counts
        .iter()
        .any(|c| c["status"] == "Consulted" && c["count"] == 1));
    // the raw spellings never surface as buckets of their own
    assert!(!status_counts
        .iter()
        .any(|c| c["status"] == "No Reply" || c["status"] == "Consult"));
}

#[test]
fn funnel_runs_maintenance_before_reporting() {
    let db = make_db("route_funnel");
    let service = svc();

    // a row imported behind the handlers' back: sales recorded but the
    // status never moved
    db.with_conn(|conn| {
        conn.execute(
            "insert into leads (name, status, sales, created_at, updated_at)
             values ('Imported', 'New', 900.0, ?1, ?1)",
            params!["2024-06-01T00:00:00+08:00"],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
    .unwrap();

    let mut resp = handle(
        empty_request(Method::GET, "/analytics/funnel"),
        &db,
        &service,
    )
    .unwrap();
    assert_eq!(resp.status(), 200);

    let report = json_body(&mut resp);
    assert_eq!(report["maintenance"]["syncedSalesStatus"], 1);

    let status_counts = report["statusCounts"].as_array().unwrap();
    assert!(status_counts
        .iter()
        .any(|c| c["status"] == "Closed Won" && c["count"] == 1));

    // the correction itself is visible in the ledger-derived numbers
    let reached = report["reachedCounts"].as_array().unwrap();
    assert!(reached
        .iter()
        .any(|c| c["status"] == "Closed Won" && c["count"] == 1));

    assert_eq!(report["wonRevenue"], 900.0);

    // a second read finds nothing left to correct
    let mut resp = handle(
        empty_request(Method::GET, "/analytics/funnel"),
        &db,
        &service,
    )
    .unwrap();
    let report = json_body(&mut resp);
    assert_eq!(report["maintenance"]["syncedSalesStatus"], 0);
}
