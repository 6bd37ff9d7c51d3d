//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Scroll database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track jobs and their state machine position
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_url TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    state TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

-- Persisted output documents
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    summary TEXT NOT NULL,
    full TEXT NOT NULL,
    tags TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    job_id INTEGER REFERENCES jobs(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_name ON items(name);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
