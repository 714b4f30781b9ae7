use crate::db::connection::Database;
use crate::errors::ServerError;
use astra::Body;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns a fresh file-backed test database with the production schema
/// applied (maintenance fans out across threads, so in-memory databases
/// don't work here).
pub fn make_db(tag: &str) -> Database {
    let path = std::env::temp_dir().join(format!(
        "{tag}_{}.sqlite",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let db = Database::new(path);
    db.with_conn(|conn| {
        conn.execute_batch(include_str!("../../sql/schema.sql"))
            .map_err(|e| ServerError::DbError(e.to_string()))
    })
    .expect("Failed to initialize test DB");
    db
}

/// Build a request with a JSON body.
pub fn json_request(method: http::Method, path: &str, body: serde_json::Value) -> astra::Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a request with no body.
pub fn empty_request(method: http::Method, path: &str) -> astra::Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

/// Drain a response body and parse it as JSON.
pub fn json_body(resp: &mut astra::Response) -> serde_json::Value {
    let mut buf = Vec::new();
    resp.body_mut().reader().read_to_end(&mut buf).unwrap();
    serde_json::from_slice(&buf).unwrap()
}
