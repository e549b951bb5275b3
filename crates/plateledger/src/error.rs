//! Error types for plateledger.
//!
//! This module defines all error types used throughout the plateledger crate.
//! These cover the fallible internals (store, filesystem, configuration);
//! admission-level failures are reported to callers as [`crate::Outcome`]
//! values rather than propagated errors.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for plateledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Image Errors ===
    /// Failed to encode a crop to the on-disk image format.
    #[error("failed to encode crop image: {source}")]
    ImageEncode {
        /// The underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// Failed to write an encoded crop to disk.
    #[error("failed to write crop image to {path}: {source}")]
    ImageWrite {
        /// Path that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for plateledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error originated in the metadata store.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::DatabaseOpen { .. } | Self::DatabaseQuery(_))
    }

    /// Check if this error originated in the image writer.
    #[must_use]
    pub fn is_image_error(&self) -> bool {
        matches!(
            self,
            Self::ImageEncode { .. } | Self::ImageWrite { .. } | Self::DirectoryCreate { .. }
        )
    }
}
