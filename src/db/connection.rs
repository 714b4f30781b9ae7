use rusqlite::Connection;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ServerError;

// Thread-local connection slot, keyed by database path so tests can
// open several databases from the same thread.
thread_local! {
    static DB_CONN: RefCell<Option<(PathBuf, Connection)>> = RefCell::new(None);
}

#[derive(Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Provides a mutable connection to the closure.
    ///
    /// Maintenance fans out across threads, so several connections to the
    /// same file can be live at once; WAL + a busy timeout keep concurrent
    /// writers from failing fast with SQLITE_BUSY.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ServerError>,
    {
        let inner_result = DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                let reopen = match slot.as_ref() {
                    Some((path, _)) => path != &self.path,
                    None => true,
                };
                if reopen {
                    let conn = Connection::open(&self.path)
                        .map_err(|e| ServerError::DbError(format!("Open DB failed: {e}")))?;
                    conn.busy_timeout(Duration::from_secs(5))
                        .map_err(|e| ServerError::DbError(format!("busy_timeout failed: {e}")))?;
                    conn.pragma_update(None, "journal_mode", "wal")
                        .map_err(|e| ServerError::DbError(format!("journal_mode failed: {e}")))?;
                    *slot = Some((self.path.clone(), conn));
                }
                let (_, conn) = slot.as_mut().unwrap();
                f(conn)
            })
            .map_err(|_| ServerError::InternalError)?;
        inner_result
    }
}

/// Initialize database from a SQL schema file
pub fn init_db(db: &Database, schema_path: &str) -> Result<(), ServerError> {
    let schema_sql = fs::read_to_string(schema_path)
        .map_err(|e| ServerError::DbError(format!("Failed to read schema file: {e}")))?;

    db.with_conn(|conn| {
        conn.execute_batch(&schema_sql)
            .map_err(|e| ServerError::DbError(format!("Failed to apply schema: {e}")))?;
        Ok(())
    })?;

    println!("Database initialized successfully from {}", schema_path);
    Ok(())
}
