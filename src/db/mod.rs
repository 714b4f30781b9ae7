pub mod connection;
pub mod leads;
pub mod lookups;
pub mod status_history;

pub use connection::Database;
