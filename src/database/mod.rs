pub mod schema;

use crate::error::AppError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Connection shared between the metadata, account and session stores
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Opens (or creates) the database at `path` and brings the schema up to date
pub fn init_database(path: &Path) -> Result<SharedConnection, AppError> {
    // Make sure the directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    schema::init_schema(&conn)?;
    log::info!("Database ready at {}", path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database with the full schema
pub fn init_in_memory() -> Result<SharedConnection, AppError> {
    let conn = Connection::open_in_memory()?;
    schema::init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the shared connection, recovering from a poisoned lock
pub fn lock(conn: &SharedConnection) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| {
        log::warn!("Database lock was poisoned; continuing with inner connection");
        poisoned.into_inner()
    })
}
