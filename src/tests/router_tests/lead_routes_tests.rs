// src/tests/router_tests/lead_routes_tests.rs

use crate::errors::ServerError;
use crate::leads::{LeadService, LeadServiceConfig};
use crate::router::handle;
use crate::tests::utils::{empty_request, json_body, json_request, make_db};
use http::Method;
use serde_json::json;

fn svc() -> LeadService {
    LeadService::new(LeadServiceConfig::default())
}

#[test]
fn create_lead_with_sales_returns_closed_won() {
    let db = make_db("route_create");
    let service = svc();

    let req = json_request(
        Method::POST,
        "/leads",
        json!({"name": "Jane", "sales": 500.0}),
    );
    let mut resp = handle(req, &db, &service).unwrap();
    assert_eq!(resp.status(), 201);

    let body = json_body(&mut resp);
    assert_eq!(body["status"], "Closed Won");
    assert_eq!(body["sales"], 500.0);
    assert!(body["closedDate"].is_string());
    assert!(body["closedMonth"].is_string());
    assert!(body["closedYear"].is_string());
    assert!(body["nextFollowUpDate"].is_null());
}

#[test]
fn create_lead_without_name_is_rejected() {
    let db = make_db("route_noname");
    let service = svc();

    let req = json_request(Method::POST, "/leads", json!({"sales": 100.0}));
    let res = handle(req, &db, &service);
    assert!(matches!(res, Err(ServerError::BadRequest(_))));
}

#[test]
fn create_then_fetch_and_list() {
    let db = make_db("route_fetch");
    let service = svc();

    let req = json_request(
        Method::POST,
        "/leads",
        json!({"name": "Ali", "status": "Contacted", "platform": "facebook"}),
    );
    let mut resp = handle(req, &db, &service).unwrap();
    let created = json_body(&mut resp);
    let id = created["id"].as_i64().unwrap();

    let mut resp = handle(
        empty_request(Method::GET, &format!("/leads/{id}")),
        &db,
        &service,
    )
    .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched = json_body(&mut resp);
    assert_eq!(fetched["name"], "Ali");
    assert_eq!(fetched["status"], "Contacted");
    assert_eq!(fetched["platform"], "Facebook");
    assert!(fetched["nextFollowUpDate"].is_string());

    let mut resp = handle(empty_request(Method::GET, "/leads"), &db, &service).unwrap();
    let listed = json_body(&mut resp);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn fetch_missing_lead_is_not_found() {
    let db = make_db("route_missing");
    let res = handle(empty_request(Method::GET, "/leads/42"), &db, &svc());
    assert!(matches!(res, Err(ServerError::NotFound)));
}

#[test]
fn bad_lead_id_is_rejected() {
    let db = make_db("route_badid");
    let res = handle(empty_request(Method::GET, "/leads/abc"), &db, &svc());
    assert!(matches!(res, Err(ServerError::BadRequest(_))));
}

#[test]
fn patch_zeroing_sales_reverts_to_consulted() {
    let db = make_db("route_revert");
    let service = svc();

    let req = json_request(
        Method::POST,
        "/leads",
        json!({"name": "Jane", "sales": 500.0}),
    );
    let mut resp = handle(req, &db, &service).unwrap();
    let id = json_body(&mut resp)["id"].as_i64().unwrap();

    let req = json_request(
        Method::PATCH,
        &format!("/leads/{id}"),
        json!({"sales": 0.0}),
    );
    let mut resp = handle(req, &db, &service).unwrap();
    assert_eq!(resp.status(), 200);

    let body = json_body(&mut resp);
    assert_eq!(body["status"], "Consulted");
    assert!(body["closedDate"].is_null());
    assert!(body["nextFollowUpDate"].is_string());
}

#[test]
fn invalid_json_body_is_rejected() {
    let db = make_db("route_badjson");
    let req = http::Request::builder()
        .method(Method::POST)
        .uri("/leads")
        .body(astra::Body::from("{not json".to_string()))
        .unwrap();
    let res = handle(req, &db, &svc());
    assert!(matches!(res, Err(ServerError::BadRequest(_))));
}

#[test]
fn unknown_route_is_not_found() {
    let db = make_db("route_unknown");
    let res = handle(empty_request(Method::GET, "/nope"), &db, &svc());
    assert!(matches!(res, Err(ServerError::NotFound)));
}
