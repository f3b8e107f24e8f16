use rusqlite::{Connection, Result};

/// Initialize complete database schema for the gallery catalog
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Schema version table for future migrations
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Check if schema already exists
    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        create_schema(conn)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Create the complete schema (version 1)
///
/// List-valued fields (size, materials, photo links) are stored as JSON text
/// so a record reads back exactly as it was written.
fn create_schema(conn: &Connection) -> Result<()> {
    // Table: paintings (catalog records)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS paintings (
            id TEXT PRIMARY KEY CHECK(length(id) = 24),
            title TEXT NOT NULL DEFAULT '',
            title_secondary TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            description_secondary TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL DEFAULT 0,
            size TEXT NOT NULL DEFAULT '[]',
            created_on TEXT NOT NULL,
            availability TEXT NOT NULL DEFAULT '',
            materials TEXT NOT NULL DEFAULT '[]',
            photo_urls TEXT NOT NULL DEFAULT '[]',
            photo_folder TEXT,
            inserted_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Trigger for updated_at in paintings
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS update_paintings_timestamp
         AFTER UPDATE ON paintings
         FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
         BEGIN
            UPDATE paintings SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
         END",
        [],
    )?;

    // Table: users (accounts)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            login TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Table: sessions (login sessions)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            authenticated INTEGER NOT NULL CHECK(authenticated IN (0,1)),
            expires_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)",
        [],
    )?;

    Ok(())
}
