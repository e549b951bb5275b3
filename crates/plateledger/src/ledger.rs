//! Detection admission and recording for plateledger.
//!
//! The ledger is the single entry point for recognized plates. Each
//! candidate passes through normalization, per-plate duplicate
//! suppression, crop image persistence, and finally the metadata row
//! insert. The crop file always lands before the row: an insert failure
//! can orphan a crop file, but a stored row always references an image
//! that exists on disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use image::DynamicImage;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dedup::{Admission, DedupWindow};
use crate::detection::{normalize_plate, Detection, Sighting};
use crate::error::Result;
use crate::images::ImageWriter;
use crate::storage::{Storage, StorageStats};

/// The result of offering a detection to the ledger.
///
/// Admission failures are ordinary outcomes, not errors: a recognizer
/// feeding the ledger needs to know what happened, but a suppressed
/// duplicate or a full SD card must not tear down the capture loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The detection was recorded durably.
    Logged {
        /// Row id assigned by the database.
        id: i64,
        /// Crop filename, relative to the crops directory.
        image_path: String,
    },
    /// A duplicate inside the suppression window was dropped.
    Skipped {
        /// Time since the plate was last recorded.
        elapsed: Duration,
    },
    /// The detection could not be durably recorded.
    StorageFailure {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The plate text normalized to an empty string.
    InvalidInput,
}

impl Outcome {
    /// Check if the detection was recorded.
    #[must_use]
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Logged { .. })
    }

    /// Check if the detection was dropped as an in-window duplicate.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Check if the detection was neither recorded nor suppressed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::StorageFailure { .. } | Self::InvalidInput)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logged { id, image_path } => {
                write!(f, "logged detection {id} -> {image_path}")
            }
            Self::Skipped { elapsed } => {
                write!(f, "skipped duplicate (seen {:.1}s ago)", elapsed.as_secs_f64())
            }
            Self::StorageFailure { reason } => write!(f, "storage failure: {reason}"),
            Self::InvalidInput => write!(f, "invalid input: empty plate text"),
        }
    }
}

/// Per-plate admission locks.
///
/// An entry exists only while at least one caller holds its lock;
/// release reclaims the entry once no other thread shares it, so the
/// table does not grow with the number of distinct plates ever seen.
#[derive(Debug, Default)]
struct KeyLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(key.to_string()).or_default())
    }

    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop the caller's clone under the table lock; a strong count
        // of one then means only the table itself still holds the entry.
        drop(lock);
        if table.get(key).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            table.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// The detection ledger.
///
/// Owns the metadata store, the crop image writer, and the suppression
/// window, and coordinates them so concurrent callers observe one
/// admitted detection per plate per window.
#[derive(Debug)]
pub struct DetectionLedger {
    storage: Storage,
    images: ImageWriter,
    window: DedupWindow,
    locks: KeyLocks,
}

impl DetectionLedger {
    /// Assemble a ledger from its parts.
    #[must_use]
    pub fn new(storage: Storage, images: ImageWriter, window: DedupWindow) -> Self {
        Self {
            storage,
            images,
            window,
            locks: KeyLocks::default(),
        }
    }

    /// Open a ledger using paths and parameters from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        let images = ImageWriter::new(config.crops_dir(), config.image.jpeg_quality);
        let window = DedupWindow::new(config.dedup_window());

        debug!(
            "Ledger opened with {}ms suppression window",
            window.window().num_milliseconds()
        );
        Ok(Self::new(storage, images, window))
    }

    /// Offer a detection to the ledger.
    ///
    /// Normalizes the plate text, suppresses in-window duplicates, and
    /// otherwise writes the crop image followed by the metadata row.
    /// Concurrent calls for the same plate are serialized; calls for
    /// different plates proceed independently.
    pub fn log_detection(&self, raw_plate: &str, confidence: f64, image: &DynamicImage) -> Outcome {
        let key = normalize_plate(raw_plate);
        if key.is_empty() {
            warn!("Rejected detection with empty plate text");
            return Outcome::InvalidInput;
        }

        let lock = self.locks.acquire(&key);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.admit(&key, confidence, image)
        };
        self.locks.release(&key, lock);
        outcome
    }

    /// Run the admission pipeline for a normalized plate key.
    ///
    /// Caller holds the per-plate lock.
    fn admit(&self, key: &str, confidence: f64, image: &DynamicImage) -> Outcome {
        let now = Utc::now();
        let last_seen = match self.storage.last_seen(key) {
            Ok(last_seen) => last_seen,
            Err(err) => {
                error!("Dedup lookup failed for {}: {}", key, err);
                return Outcome::StorageFailure {
                    reason: err.to_string(),
                };
            }
        };

        if let Admission::Suppress { elapsed } = self.window.decide(last_seen, now) {
            let elapsed = elapsed.to_std().unwrap_or_default();
            info!(
                "Skipping duplicate: {} (seen {:.1}s ago)",
                key,
                elapsed.as_secs_f64()
            );
            return Outcome::Skipped { elapsed };
        }

        // The event timestamp is taken after admission; it names the
        // crop file and must match the stored row exactly.
        let timestamp = Utc::now();
        let image_path = match self.images.write(image, timestamp) {
            Ok(filename) => filename,
            Err(err) => {
                error!("Crop write failed for {}: {}", key, err);
                return Outcome::StorageFailure {
                    reason: err.to_string(),
                };
            }
        };

        let detection = Detection::new(key, confidence, timestamp, image_path);
        match self.storage.insert(&detection) {
            Ok(id) => {
                info!(
                    "Logged detection {} for plate {} -> {}",
                    id, key, detection.image_path
                );
                Outcome::Logged {
                    id,
                    image_path: detection.image_path,
                }
            }
            Err(err) => {
                error!(
                    "Row insert failed for {}, crop {} is orphaned: {}",
                    key,
                    self.images.full_path(&detection.image_path).display(),
                    err
                );
                Outcome::StorageFailure {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// All recorded sightings of a plate, most recent first.
    ///
    /// The query text is normalized the same way detections are, so any
    /// casing or padding finds the same plate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn plate_history(&self, raw_plate: &str, limit: usize) -> Result<Vec<Sighting>> {
        let key = normalize_plate(raw_plate);
        let detections = self.storage.plate_history(&key, limit)?;
        Ok(detections.iter().map(Sighting::from).collect())
    }

    /// The most recent detections across all plates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<Detection>> {
        self.storage.recent(limit)
    }

    /// Ledger statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }
}
