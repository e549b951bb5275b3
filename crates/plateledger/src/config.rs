//! Configuration management for plateledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "plateledger";

/// Default base directory on the device's removable storage.
const DEFAULT_BASE_DIR: &str = "/mnt/sdcard/alpr_data";

/// Database file name within the base directory.
const DATABASE_FILE_NAME: &str = "plates.db";

/// Crop image directory name within the base directory.
const CROPS_DIR_NAME: &str = "crops";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PLATELEDGER_`)
/// 2. TOML config file at `~/.config/plateledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Duplicate-suppression configuration.
    pub dedup: DedupConfig,
    /// Crop image configuration.
    pub image: ImageConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for the database and crop images.
    /// Defaults to `/mnt/sdcard/alpr_data`.
    pub base_dir: Option<PathBuf>,
}

/// Duplicate-suppression configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Width of the per-plate suppression window in milliseconds.
    pub window_ms: u64,
}

/// Crop image configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// JPEG quality for crop images (1-100).
    pub jpeg_quality: u8,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { window_ms: 5_000 }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `PLATELEDGER_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// Environment variables use `__` to separate section from key, e.g.
    /// `PLATELEDGER_DEDUP__WINDOW_MS=2000`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PLATELEDGER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.dedup.window_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "window_ms must be greater than 0".to_string(),
            });
        }

        if self.image.jpeg_quality == 0 || self.image.jpeg_quality > 100 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "jpeg_quality must be between 1 and 100, got {}",
                    self.image.jpeg_quality
                ),
            });
        }

        Ok(())
    }

    /// Get the base directory, resolving defaults if not set.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.storage
            .base_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR))
    }

    /// Get the database file path under the base directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir().join(DATABASE_FILE_NAME)
    }

    /// Get the crop image directory under the base directory.
    #[must_use]
    pub fn crops_dir(&self) -> PathBuf {
        self.base_dir().join(CROPS_DIR_NAME)
    }

    /// Get the suppression window as a Duration.
    #[must_use]
    pub fn dedup_window(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.dedup.window_ms).unwrap_or(i64::MAX))
    }
}
