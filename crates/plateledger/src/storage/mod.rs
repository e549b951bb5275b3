//! Storage layer for plateledger.
//!
//! This module provides `SQLite`-based persistent storage for plate
//! detections. The database holds metadata only; crop images live as
//! plain JPEG files next to it and rows reference them by filename.

pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::detection::Detection;
use crate::error::{Error, Result};

/// Storage engine for plate detections.
///
/// Holds a single long-lived connection behind a mutex. `SQLite`
/// serializes writers regardless, and one connection keeps WAL
/// checkpointing predictable on SD-card filesystems.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, shared across threads.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a detection database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        schema::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock the shared connection.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("storage connection lock poisoned"))
    }

    /// Insert a detection and return its assigned row id.
    ///
    /// The detection's plate text is expected to be normalized already;
    /// storage writes exactly what it is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, detection: &Detection) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            r"
            INSERT INTO detections (timestamp_us, plate_text, confidence, image_path)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                detection.timestamp.timestamp_micros(),
                detection.plate_text,
                detection.confidence,
                detection.image_path,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Inserted detection {} for plate {}", id, detection.plate_text);
        Ok(id)
    }

    /// Get the timestamp of the most recently recorded sighting of a plate.
    ///
    /// Recency follows insertion order (`id`), not the stored timestamp,
    /// so a backward clock adjustment between writes cannot promote an
    /// older row back to "current".
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored
    /// timestamp cannot be decoded.
    pub fn last_seen(&self, plate_text: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock_conn()?;
        let micros: Option<i64> = conn
            .query_row(
                r"
                SELECT timestamp_us FROM detections
                WHERE plate_text = ?1 ORDER BY id DESC LIMIT 1
                ",
                [plate_text],
                |row| row.get(0),
            )
            .optional()?;

        match micros {
            Some(us) => Ok(Some(Self::timestamp_from_micros(0, us)?)),
            None => Ok(None),
        }
    }

    /// Get all recorded sightings of a plate, most recent first.
    ///
    /// Results are ordered by event timestamp (ties broken by row id),
    /// which is the order a reviewer reads a timeline in.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn plate_history(&self, plate_text: &str, limit: usize) -> Result<Vec<Detection>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, timestamp_us, plate_text, confidence, image_path
            FROM detections WHERE plate_text = ?1
            ORDER BY timestamp_us DESC, id DESC LIMIT ?2
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let detections = stmt
            .query_map(params![plate_text, limit_i64], Self::row_to_detection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(detections)
    }

    /// Get the most recent detections across all plates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<Detection>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, timestamp_us, plate_text, confidence, image_path
            FROM detections ORDER BY timestamp_us DESC, id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let detections = stmt
            .query_map([limit_i64], Self::row_to_detection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(detections)
    }

    /// Count total detections in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM detections", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        // Single lock acquisition; lock_conn is not reentrant.
        let conn = self.lock_conn()?;

        let total_detections: i64 =
            conn.query_row("SELECT COUNT(*) FROM detections", [], |row| row.get(0))?;

        let unique_plates: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT plate_text) FROM detections",
            [],
            |row| row.get(0),
        )?;

        let oldest: Option<i64> =
            conn.query_row("SELECT MIN(timestamp_us) FROM detections", [], |row| {
                row.get(0)
            })?;
        let newest: Option<i64> =
            conn.query_row("SELECT MAX(timestamp_us) FROM detections", [], |row| {
                row.get(0)
            })?;

        let oldest_detection = match oldest {
            Some(us) => Some(Self::timestamp_from_micros(0, us)?),
            None => None,
        };
        let newest_detection = match newest {
            Some(us) => Some(Self::timestamp_from_micros(0, us)?),
            None => None,
        };

        // Get database file size
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_detections,
            unique_plates,
            oldest_detection,
            newest_detection,
            db_size_bytes,
        })
    }

    /// Run arbitrary SQL, for fault injection in tests.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Convert a database row to a Detection struct.
    fn row_to_detection(row: &rusqlite::Row) -> rusqlite::Result<Detection> {
        let id: i64 = row.get(0)?;
        let timestamp_us: i64 = row.get(1)?;
        let plate_text: String = row.get(2)?;
        let confidence: f64 = row.get(3)?;
        let image_path: String = row.get(4)?;

        Ok(Detection {
            id: Some(id),
            timestamp: Self::timestamp_from_micros(1, timestamp_us)?,
            plate_text,
            confidence,
            image_path,
        })
    }

    /// Decode an epoch-microsecond column value.
    ///
    /// An out-of-range value is surfaced as a conversion error rather
    /// than silently replaced; this is an evidentiary record.
    fn timestamp_from_micros(column: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Integer,
                format!("timestamp {micros} out of range").into(),
            )
        })
    }
}

/// Statistics about the detection ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of detections stored.
    pub total_detections: i64,
    /// Number of distinct plates seen.
    pub unique_plates: i64,
    /// Timestamp of the oldest detection.
    pub oldest_detection: Option<DateTime<Utc>>,
    /// Timestamp of the newest detection.
    pub newest_detection: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    /// A current timestamp truncated to microsecond precision, matching
    /// what storage round-trips.
    fn now_at_micros() -> DateTime<Utc> {
        DateTime::from_timestamp_micros(Utc::now().timestamp_micros()).unwrap()
    }

    fn create_test_detection(plate: &str, timestamp: DateTime<Utc>) -> Detection {
        Detection::new(plate, 0.91, timestamp, "plate_test.jpg")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_insert_and_query_roundtrip() {
        let storage = create_test_storage();
        let timestamp = now_at_micros();
        let detection = Detection::new("ABC123", 0.987654, timestamp, "plate_20260821.jpg");

        let id = storage.insert(&detection).unwrap();
        assert!(id > 0);

        let history = storage.plate_history("ABC123", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, Some(id));
        assert_eq!(history[0].timestamp, timestamp);
        assert_eq!(history[0].plate_text, "ABC123");
        assert_eq!(history[0].confidence, 0.9877);
        assert_eq!(history[0].image_path, "plate_20260821.jpg");
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let storage = create_test_storage();
        let now = now_at_micros();

        let id1 = storage.insert(&create_test_detection("AAA111", now)).unwrap();
        let id2 = storage.insert(&create_test_detection("BBB222", now)).unwrap();
        assert!(id2 > id1);
    }

    #[test]
    fn test_last_seen_unknown_plate() {
        let storage = create_test_storage();
        assert!(storage.last_seen("GHOST").unwrap().is_none());
    }

    #[test]
    fn test_last_seen_returns_timestamp() {
        let storage = create_test_storage();
        let timestamp = now_at_micros();

        storage
            .insert(&create_test_detection("ABC123", timestamp))
            .unwrap();

        let last = storage.last_seen("ABC123").unwrap();
        assert_eq!(last, Some(timestamp));
    }

    #[test]
    fn test_last_seen_tracks_most_recent_insert() {
        let storage = create_test_storage();
        let now = now_at_micros();
        let earlier = now - Duration::seconds(30);

        // The later insert carries an earlier timestamp (clock stepped
        // backward between writes). last_seen must follow insert order.
        storage.insert(&create_test_detection("ABC123", now)).unwrap();
        storage
            .insert(&create_test_detection("ABC123", earlier))
            .unwrap();

        assert_eq!(storage.last_seen("ABC123").unwrap(), Some(earlier));
    }

    #[test]
    fn test_last_seen_ignores_other_plates() {
        let storage = create_test_storage();
        let now = now_at_micros();

        storage.insert(&create_test_detection("AAA111", now)).unwrap();
        assert!(storage.last_seen("BBB222").unwrap().is_none());
    }

    #[test]
    fn test_plate_history_ordering() {
        let storage = create_test_storage();
        let base = now_at_micros();
        let t1 = base - Duration::seconds(20);
        let t2 = base - Duration::seconds(10);
        let t3 = base;

        // Insert out of timestamp order
        storage.insert(&create_test_detection("ABC123", t1)).unwrap();
        storage.insert(&create_test_detection("ABC123", t3)).unwrap();
        storage.insert(&create_test_detection("ABC123", t2)).unwrap();

        let history = storage.plate_history("ABC123", 10).unwrap();
        let timestamps: Vec<_> = history.iter().map(|d| d.timestamp).collect();
        assert_eq!(timestamps, vec![t3, t2, t1]);
    }

    #[test]
    fn test_plate_history_filters_by_plate() {
        let storage = create_test_storage();
        let now = now_at_micros();

        storage.insert(&create_test_detection("AAA111", now)).unwrap();
        storage.insert(&create_test_detection("BBB222", now)).unwrap();
        storage.insert(&create_test_detection("AAA111", now)).unwrap();

        let history = storage.plate_history("AAA111", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|d| d.plate_text == "AAA111"));
    }

    #[test]
    fn test_plate_history_limit() {
        let storage = create_test_storage();
        let base = now_at_micros();

        for i in 0..5 {
            let detection =
                create_test_detection("ABC123", base - Duration::seconds(i64::from(i)));
            storage.insert(&detection).unwrap();
        }

        let history = storage.plate_history("ABC123", 3).unwrap();
        assert_eq!(history.len(), 3);
        // Most recent three
        assert_eq!(history[0].timestamp, base);
    }

    #[test]
    fn test_recent_across_plates() {
        let storage = create_test_storage();
        let base = now_at_micros();

        storage
            .insert(&create_test_detection("AAA111", base - Duration::seconds(2)))
            .unwrap();
        storage
            .insert(&create_test_detection("BBB222", base - Duration::seconds(1)))
            .unwrap();
        storage.insert(&create_test_detection("CCC333", base)).unwrap();

        let recent = storage.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].plate_text, "CCC333");
        assert_eq!(recent[1].plate_text, "BBB222");
    }

    #[test]
    fn test_count() {
        let storage = create_test_storage();
        assert_eq!(storage.count().unwrap(), 0);

        let now = now_at_micros();
        storage.insert(&create_test_detection("AAA111", now)).unwrap();
        storage.insert(&create_test_detection("BBB222", now)).unwrap();

        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.total_detections, 0);
        assert_eq!(stats.unique_plates, 0);
        assert!(stats.oldest_detection.is_none());
        assert!(stats.newest_detection.is_none());
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        let base = now_at_micros();

        storage
            .insert(&create_test_detection("AAA111", base - Duration::seconds(10)))
            .unwrap();
        storage.insert(&create_test_detection("AAA111", base)).unwrap();
        storage.insert(&create_test_detection("BBB222", base)).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.unique_plates, 2);
        assert_eq!(stats.oldest_detection, Some(base - Duration::seconds(10)));
        assert_eq!(stats.newest_detection, Some(base));
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_shared_across_threads() {
        let storage = create_test_storage();
        let now = now_at_micros();

        std::thread::scope(|s| {
            s.spawn(|| {
                storage.insert(&create_test_detection("AAA111", now)).unwrap();
            });
            s.spawn(|| {
                storage.insert(&create_test_detection("BBB222", now)).unwrap();
            });
        });

        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_open_file_based() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("plateledger_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        storage
            .insert(&create_test_detection("ABC123", now_at_micros()))
            .unwrap();
        assert_eq!(storage.count().unwrap(), 1);
        assert_eq!(storage.path(), db_path);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let nested_path = temp_dir.join(format!(
            "plateledger_test_{}/nested/plates.db",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent.parent().unwrap());
        }
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("plateledger_reopen_test_{}.db", std::process::id()));
        let _ = std::fs::remove_file(&db_path);

        let timestamp = now_at_micros();
        {
            let storage = Storage::open(&db_path).unwrap();
            storage
                .insert(&create_test_detection("ABC123", timestamp))
                .unwrap();
        }

        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(storage.count().unwrap(), 1);
        assert_eq!(storage.last_seen("ABC123").unwrap(), Some(timestamp));

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_stats_db_size() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("plateledger_size_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        storage
            .insert(&create_test_detection("ABC123", now_at_micros()))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert!(stats.db_size_bytes > 0);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_storage_stats_debug() {
        let stats = StorageStats {
            total_detections: 10,
            unique_plates: 3,
            oldest_detection: Some(Utc::now()),
            newest_detection: Some(Utc::now()),
            db_size_bytes: 1024,
        };
        let debug_str = format!("{stats:?}");
        assert!(debug_str.contains("total_detections"));
        assert!(debug_str.contains("10"));
    }

    #[test]
    fn test_storage_preserves_given_plate_text() {
        // Normalization happens upstream; storage writes what it gets.
        let storage = create_test_storage();
        let detection = Detection {
            id: None,
            timestamp: now_at_micros(),
            plate_text: "raw text".to_string(),
            confidence: 0.5,
            image_path: "x.jpg".to_string(),
        };

        storage.insert(&detection).unwrap();
        assert!(storage.last_seen("raw text").unwrap().is_some());
        assert!(storage.last_seen("RAW TEXT").unwrap().is_none());
    }
}
