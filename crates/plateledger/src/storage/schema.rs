//! `SQLite` schema definitions for plateledger.
//!
//! This module contains the SQL statements for creating the detection
//! ledger schema. The schema is append-only and created idempotently at
//! every open; there is no versioned migration machinery.

use rusqlite::Connection;

use crate::error::Result;

/// SQL statement to create the detections table.
///
/// Timestamps are stored as epoch microseconds so ordering and window
/// arithmetic compare integers rather than parsing strings.
pub const CREATE_DETECTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS detections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp_us INTEGER NOT NULL,
    plate_text TEXT NOT NULL,
    confidence REAL NOT NULL,
    image_path TEXT NOT NULL
)
";

/// SQL statement to create an index on `plate_text` for per-plate lookups.
pub const CREATE_PLATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_detections_plate ON detections(plate_text)
";

/// SQL statement to create an index on `timestamp_us` for timeline queries.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_detections_timestamp ON detections(timestamp_us DESC)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DETECTIONS_TABLE,
    CREATE_PLATE_INDEX,
    CREATE_TIMESTAMP_INDEX,
];

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist. Safe to call on
/// every open.
///
/// # Errors
///
/// Returns an error if schema creation fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}
