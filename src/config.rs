//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the judgment retrieval system, supporting
//! TOML files and environment variable overrides with validation and type-safe
//! access to all settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: URL checks, TTL range checks, worker pool bounds
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)

use crate::errors::{Result, RetrievalError};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// First year of the supported metadata partition range
pub const START_YEAR: u16 = 1950;

/// Last year of the supported metadata partition range (current calendar year)
pub fn current_year() -> u16 {
    chrono::Utc::now().year() as u16
}

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Object store endpoint settings
    pub remote: RemoteConfig,
    /// Cache tier TTLs
    pub cache: CacheConfig,
    /// Combined dataset build settings
    pub dataset: DatasetConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Object store endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the public object store
    pub base_url: String,
    /// Timeout for metadata and index fetches, in seconds
    pub document_timeout_seconds: u64,
    /// Timeout for shard downloads, in seconds
    pub shard_timeout_seconds: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

/// Cache tier TTL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Per-year metadata cache TTL, in seconds
    pub metadata_ttl_seconds: u64,
    /// Per-(year, language) archive index cache TTL, in seconds
    pub index_ttl_seconds: u64,
    /// Resolved case cache TTL, in seconds
    pub case_ttl_seconds: u64,
}

/// Combined dataset build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// First year fetched by the cold build
    pub start_year: u16,
    /// Worker pool width for per-year metadata fetches
    pub max_concurrent_fetches: usize,
    /// Local snapshot database path for the materialized dataset
    pub snapshot_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Config {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a TOML file, then apply env overrides and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RetrievalError::Config {
                message: format!(
                    "Failed to read config file {:?}: {}",
                    path.as_ref(),
                    e
                ),
            }
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| {
            RetrievalError::Config {
                message: format!("Failed to parse config file: {}", e),
            }
        })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("JUDGMENT_ARCHIVE_BASE_URL") {
            self.remote.base_url = base_url;
        }
        if let Ok(level) = std::env::var("JUDGMENT_ARCHIVE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(path) = std::env::var("JUDGMENT_ARCHIVE_SNAPSHOT_PATH") {
            self.dataset.snapshot_path = PathBuf::from(path);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.remote.base_url.starts_with("http://")
            && !self.remote.base_url.starts_with("https://")
        {
            return Err(RetrievalError::Config {
                message: format!("Invalid base URL: {}", self.remote.base_url),
            });
        }

        if self.remote.document_timeout_seconds == 0 || self.remote.shard_timeout_seconds == 0 {
            return Err(RetrievalError::Config {
                message: "Timeouts must be greater than zero".to_string(),
            });
        }

        if self.cache.metadata_ttl_seconds == 0
            || self.cache.index_ttl_seconds == 0
            || self.cache.case_ttl_seconds == 0
        {
            return Err(RetrievalError::Config {
                message: "Cache TTLs must be greater than zero".to_string(),
            });
        }

        if self.dataset.max_concurrent_fetches == 0 {
            return Err(RetrievalError::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
            });
        }

        if self.dataset.start_year < START_YEAR || self.dataset.start_year > current_year() {
            return Err(RetrievalError::Config {
                message: format!(
                    "start_year {} outside supported range [{}, {}]",
                    self.dataset.start_year,
                    START_YEAR,
                    current_year()
                ),
            });
        }

        Ok(())
    }

    /// Metadata/index request timeout
    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.document_timeout_seconds)
    }

    /// Shard download timeout
    pub fn shard_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.shard_timeout_seconds)
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RetrievalError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig {
                base_url: "https://indian-supreme-court-judgments.s3.amazonaws.com".to_string(),
                document_timeout_seconds: 30,
                shard_timeout_seconds: 120,
                user_agent: "judgment-archive/0.1".to_string(),
            },
            cache: CacheConfig {
                metadata_ttl_seconds: 3600,
                index_ttl_seconds: 7200,
                case_ttl_seconds: 3600,
            },
            dataset: DatasetConfig {
                start_year: START_YEAR,
                max_concurrent_fetches: 10,
                snapshot_path: PathBuf::from("./data/snapshot"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dataset.max_concurrent_fetches, 10);
        assert_eq!(config.cache.index_ttl_seconds, 7200);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.remote.base_url, config.remote.base_url);
        assert_eq!(parsed.cache.metadata_ttl_seconds, 3600);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();
        config.remote.base_url = "ftp://nope".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dataset.max_concurrent_fetches = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dataset.start_year = 1900;
        assert!(config.validate().is_err());
    }
}
