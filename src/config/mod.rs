//! Configuration module
//!
//! This module defines the sniffer configuration consumed by the embedding
//! process. The core is a library, so there is no file watching or layered
//! loading here; the host application deserializes whatever source it likes
//! (JSON shown) and hands the validated result in.

pub mod defaults;

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse a configuration document
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the sniffer cannot operate with
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Sniffer configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SnifferConfig {
    /// Overall budget for one stream sniff attempt, in milliseconds
    #[serde(default = "defaults::read_payload_timeout_ms")]
    pub read_payload_timeout_ms: u64,

    /// Initial capacity of the peek buffer, in bytes
    #[serde(default = "defaults::buffer_capacity")]
    pub buffer_capacity: usize,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            read_payload_timeout_ms: defaults::READ_PAYLOAD_TIMEOUT_MS,
            buffer_capacity: defaults::BUFFER_CAPACITY,
        }
    }
}

impl SnifferConfig {
    /// Parse a configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SnifferConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Overall stream sniff budget as a `Duration`
    pub fn read_payload_timeout(&self) -> Duration {
        Duration::from_millis(self.read_payload_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.read_payload_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "read_payload_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer_capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SnifferConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_payload_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = SnifferConfig::from_json("{}").unwrap();
        assert_eq!(config, SnifferConfig::default());
    }

    #[test]
    fn test_from_json_overrides() {
        let config = SnifferConfig::from_json(
            r#"{"read_payload_timeout_ms": 1000, "buffer_capacity": 8192}"#,
        )
        .unwrap();
        assert_eq!(config.read_payload_timeout_ms, 1000);
        assert_eq!(config.buffer_capacity, 8192);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = SnifferConfig::from_json(r#"{"read_payload_timeout_ms": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SnifferConfig::from_json(r#"{"no_such_field": true}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
