//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Every stored output record, one JSON payload per row
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data_type TEXT NOT NULL,
    source TEXT NOT NULL,
    content_type TEXT NOT NULL DEFAULT '',
    record_key INTEGER NOT NULL,
    content_id INTEGER,
    payload TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    UNIQUE(data_type, source, content_type, record_key)
);

CREATE INDEX IF NOT EXISTS idx_records_data_type ON records(data_type);
CREATE INDEX IF NOT EXISTS idx_records_content ON records(content_id);

-- Named scalar slots; the checkpoint lives here
CREATE TABLE IF NOT EXISTS harvest_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Name of the slot holding the resumable checkpoint
pub const CHECKPOINT_KEY: &str = "checkpoint";

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
