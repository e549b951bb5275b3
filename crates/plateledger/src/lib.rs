//! `plateledger` - A detection ledger for license plate recognition on edge devices
//!
//! This library persists plate recognition events to SD-card-friendly storage:
//! a `SQLite` ledger of detection metadata paired with a directory of
//! evidentiary JPEG crops, with per-plate time-window deduplication so a
//! vehicle lingering in frame produces one row instead of hundreds.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dedup;
pub mod detection;
pub mod error;
pub mod images;
pub mod ledger;
pub mod logging;
pub mod storage;

pub use config::Config;
pub use dedup::{Admission, DedupWindow};
pub use detection::{normalize_plate, round_confidence, Detection, Sighting};
pub use error::{Error, Result};
pub use images::ImageWriter;
pub use ledger::{DetectionLedger, Outcome};
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
