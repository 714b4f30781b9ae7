use crate::db::connection::{init_db, Database};
use crate::leads::{LeadService, LeadServiceConfig};
use crate::responses::error_to_response;
use crate::router::handle;
use astra::Server;
use std::net::SocketAddr;

mod analytics;
mod db;
mod domain;
mod errors;
mod leads;
mod maintenance;
mod responses;
mod router;

#[cfg(test)]
mod tests;

fn main() {
    let db = Database::new("leadtrack.sqlite3");

    if let Err(e) = init_db(&db, "sql/schema.sql") {
        eprintln!("Database initialization failed: {e}");
        std::process::exit(1);
    }

    // FOLLOW_UP_DAYS tunes stale-contact promotion and follow-up
    // scheduling; defaults to 3.
    let svc = LeadService::new(LeadServiceConfig::from_env());

    let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
    println!("Starting server at http://{addr}");

    let server = Server::bind(&addr).max_workers(8);

    let result = server.serve(move |req, _info| match handle(req, &db, &svc) {
        Ok(resp) => resp,
        Err(err) => error_to_response(err),
    });

    if let Err(e) = result {
        eprintln!("Server ended with error: {e}");
    }

    println!("Server shut down cleanly.");
}
