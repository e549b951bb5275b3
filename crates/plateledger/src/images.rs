//! Crop image persistence for plateledger.
//!
//! Evidentiary plate crops are stored as plain JPEG files in a flat
//! directory next to the database. The encode happens fully in memory
//! and the file lands in a single write call, so a crop either exists
//! as a complete JPEG or not at all.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageOutputFormat};
use tracing::debug;

use crate::error::{Error, Result};

/// Writer for evidentiary crop images.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    /// Directory crop files are written into.
    dir: PathBuf,
    /// JPEG quality (1-100).
    quality: u8,
}

impl ImageWriter {
    /// Create a writer targeting the given directory.
    ///
    /// The directory is created lazily on first write, not here, so a
    /// writer can be constructed before removable storage is mounted.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            quality,
        }
    }

    /// The directory crop files are written into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a crop image for a detection at the given timestamp.
    ///
    /// Returns the filename (relative to the crop directory) that the
    /// ledger stores alongside the detection row. Filenames carry the
    /// timestamp at microsecond precision, so two admitted detections
    /// cannot collide.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the image
    /// cannot be encoded, or the file cannot be written.
    pub fn write(&self, image: &DynamicImage, timestamp: DateTime<Utc>) -> Result<String> {
        std::fs::create_dir_all(&self.dir).map_err(|source| Error::DirectoryCreate {
            path: self.dir.clone(),
            source,
        })?;

        let filename = Self::filename_for(timestamp);
        let path = self.dir.join(&filename);

        let mut buf = Vec::new();
        image
            .write_to(
                &mut Cursor::new(&mut buf),
                ImageOutputFormat::Jpeg(self.quality),
            )
            .map_err(|source| Error::ImageEncode { source })?;

        std::fs::write(&path, &buf).map_err(|source| Error::ImageWrite {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote crop image {} ({} bytes)", path.display(), buf.len());
        Ok(filename)
    }

    /// The full on-disk path for a stored crop filename.
    #[must_use]
    pub fn full_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Build the crop filename for a detection timestamp.
    fn filename_for(timestamp: DateTime<Utc>) -> String {
        format!("plate_{}.jpg", timestamp.format("%Y%m%d_%H%M%S_%6f"))
    }
}
