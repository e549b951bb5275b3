//! Core detection types for plateledger.
//!
//! This module defines the fundamental data structures for representing
//! recognized license plates and the normalization rules applied to them
//! before they reach the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalize a raw plate reading into its canonical key form.
///
/// Leading and trailing whitespace is stripped and all characters are
/// uppercased. Interior whitespace is preserved. Two readings of the same
/// physical plate normalize to the same key regardless of recognizer casing.
#[must_use]
pub fn normalize_plate(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Round a recognizer confidence score to four decimal places.
///
/// Recognizers emit full-precision floats; the ledger stores a stable
/// four-decimal representation so repeated sightings compare cleanly.
#[must_use]
pub fn round_confidence(confidence: f64) -> f64 {
    (confidence * 10_000.0).round() / 10_000.0
}

/// A single recorded plate detection.
///
/// Represents one admitted sighting with metadata about when it occurred,
/// what was read, and where the evidentiary crop image was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Unique identifier for this detection (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// When this detection occurred.
    pub timestamp: DateTime<Utc>,

    /// The normalized plate text.
    pub plate_text: String,

    /// Recognizer confidence, rounded to four decimal places.
    pub confidence: f64,

    /// Filename of the crop image, relative to the crops directory.
    pub image_path: String,
}

impl Detection {
    /// Create a new detection from a raw recognizer reading.
    ///
    /// The plate text is normalized and the confidence is rounded; the
    /// caller supplies the event timestamp and the crop image filename.
    #[must_use]
    pub fn new(
        raw_plate: &str,
        confidence: f64,
        timestamp: DateTime<Utc>,
        image_path: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp,
            plate_text: normalize_plate(raw_plate),
            confidence: round_confidence(confidence),
            image_path: image_path.into(),
        }
    }

    /// Check if the normalized plate text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plate_text.is_empty()
    }
}

/// A single historical sighting of a plate.
///
/// History queries return these rather than full [`Detection`] records:
/// the plate text is implied by the query and the image path is not
/// needed for timeline review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    /// When the sighting occurred.
    pub timestamp: DateTime<Utc>,

    /// Recognizer confidence at the time of the sighting.
    pub confidence: f64,
}

impl From<&Detection> for Sighting {
    fn from(detection: &Detection) -> Self {
        Self {
            timestamp: detection.timestamp,
            confidence: detection.confidence,
        }
    }
}
