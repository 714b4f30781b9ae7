use crate::analytics;
use crate::db::connection::Database;
use crate::db::leads as db_leads;
use crate::domain::dates;
use crate::domain::lead::{LeadPatch, NewLead};
use crate::errors::ServerError;
use crate::leads::LeadService;
use crate::maintenance::{run_status_maintenance, MaintenanceConfig};
use crate::responses::{json_response, json_response_with_status, ResultResp};
use astra::Request;
use serde::de::DeserializeOwned;
use std::io::Read;

pub fn handle(mut req: Request, db: &Database, svc: &LeadService) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["leads"]) => {
            let input: NewLead = read_json_body(&mut req)?;
            let lead = svc.create_lead(db, input, &dates::now_canonical())?;
            json_response_with_status(201, &lead)
        }

        ("GET", ["leads"]) => {
            let leads = db.with_conn(|conn| db_leads::list_leads(conn))?;
            json_response(&leads)
        }

        ("GET", ["leads", id]) => {
            let id = parse_id(id)?;
            let lead = db
                .with_conn(|conn| db_leads::get_lead(conn, id))?
                .ok_or(ServerError::NotFound)?;
            json_response(&lead)
        }

        ("PATCH", ["leads", id]) | ("PUT", ["leads", id]) => {
            let id = parse_id(id)?;
            let patch: LeadPatch = read_json_body(&mut req)?;
            let lead = svc.update_lead(db, id, patch, &dates::now_canonical())?;
            json_response(&lead)
        }

        ("POST", ["maintenance", "run"]) => {
            let cfg = MaintenanceConfig {
                follow_up_days: svc.follow_up_days(),
            };
            let report = run_status_maintenance(db, &cfg)?;
            json_response(&report)
        }

        // maintenance runs on the way in so the funnel never reports
        // rows that contradict the invariants
        ("GET", ["analytics", "funnel"]) => {
            let cfg = MaintenanceConfig {
                follow_up_days: svc.follow_up_days(),
            };
            let report = analytics::funnel_report(db, &cfg)?;
            json_response(&report)
        }

        _ => Err(ServerError::NotFound),
    }
}

fn parse_id(raw: &str) -> Result<i64, ServerError> {
    raw.parse::<i64>()
        .map_err(|_| ServerError::BadRequest(format!("invalid lead id '{raw}'")))
}

fn read_json_body<T: DeserializeOwned>(req: &mut Request) -> Result<T, ServerError> {
    let mut buf = Vec::new();
    req.body_mut()
        .reader()
        .read_to_end(&mut buf)
        .map_err(|e| ServerError::BadRequest(format!("could not read body: {e}")))?;

    serde_json::from_slice(&buf)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}
