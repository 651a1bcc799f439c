//! Configuration Module
//!
//! This module defines all configuration structures for the batcher.
//! Configuration is loaded from TOML files and parsed using serde.

use crate::{batch::DEFAULT_CAPACITY, error::BatchError};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Main configuration structure
///
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [batch]
/// capacity = 50
/// flush_interval_ms = 5000
/// max_flush_attempts = 3
/// retry_backoff_ms = 1000
///
/// [database]
/// url = "sqlite://transactions.db"
///
/// [source]
/// path = "data/transactions.jsonl"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchConfig,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
}

/// Batch buffering configuration
///
/// # Fields
/// - `capacity`: Maximum number of records held before a flush (default 50)
/// - `flush_interval_ms`: Flush a partial batch after this long (0 disables)
/// - `max_flush_attempts`: Tries per flush before giving up
/// - `retry_backoff_ms`: Fixed pause between flush attempts
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_max_flush_attempts")]
    pub max_flush_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            flush_interval_ms: default_flush_interval_ms(),
            max_flush_attempts: default_max_flush_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl BatchConfig {
    /// Interval for flushing partial batches, `None` when disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_ms > 0).then(|| Duration::from_millis(self.flush_interval_ms))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_max_flush_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// Database configuration
///
/// # Fields
/// - `url`: Database connection URL (e.g., "sqlite://transactions.db")
/// - `max_connections`: Connection pool size
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    1
}

/// Record source configuration
///
/// # Fields
/// - `path`: JSON-lines file of transaction/receipt pairs
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub path: String,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was loaded, parsed and validated
    /// * `Err` if the file couldn't be read, the TOML is invalid, or a value
    ///   is out of range
    pub fn load(path: &str) -> anyhow::Result<Self> {
        // Read the file contents as a string
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the batcher cannot start with
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.batch.capacity == 0 {
            return Err(BatchError::Configuration(
                "batch.capacity must be greater than zero".to_string(),
            ));
        }
        if self.batch.max_flush_attempts == 0 {
            return Err(BatchError::Configuration(
                "batch.max_flush_attempts must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(BatchError::Configuration(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [database]
        url = "sqlite::memory:"

        [source]
        path = "transactions.jsonl"
    "#;

    #[test]
    fn test_defaults_apply_when_batch_section_missing() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.batch.capacity, 50);
        assert_eq!(config.batch.max_flush_attempts, 3);
        assert_eq!(config.batch.flush_interval(), Some(Duration::from_millis(5000)));
        assert_eq!(config.database.max_connections, 1);
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let toml = format!(
            "[batch]\ncapacity = 2\nflush_interval_ms = 0\nretry_backoff_ms = 10\n{MINIMAL}"
        );
        let config = Config::parse(&toml).unwrap();

        assert_eq!(config.batch.capacity, 2);
        assert_eq!(config.batch.flush_interval(), None);
        assert_eq!(config.batch.retry_backoff(), Duration::from_millis(10));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let toml = format!("[batch]\ncapacity = 0\n{MINIMAL}");
        let err = Config::parse(&toml).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BatchError>(),
            Some(BatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_flush_attempts_is_rejected() {
        let toml = format!("[batch]\nmax_flush_attempts = 0\n{MINIMAL}");
        assert!(Config::parse(&toml).is_err());
    }
}
