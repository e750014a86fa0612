//! Configuration file parsing
//!
//! Parses optional TOML configuration for the file server. Command line
//! arguments override anything set here.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Transfer tuning
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (without port)
    #[serde(default = "default_bind")]
    pub bind: String,

    /// TCP port; may also be given on the command line
    #[serde(default)]
    pub port: Option<u16>,

    /// Directory files are stored in and served from
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: None,
            storage_dir: None,
            log_level: default_log_level(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Transfer tuning
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Payload chunk size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_buffer_size() -> usize {
    crate::channel::DEFAULT_BUFFER_SIZE
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == Some(0) {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }

        if self.transfer.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "transfer.buffer_size must be greater than zero".to_string(),
            ));
        }

        if parse_log_level(&self.server.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level: {}",
                self.server.log_level
            )));
        }

        Ok(())
    }
}

/// Parse log level string
pub fn parse_log_level(level: &str) -> Option<log::LevelFilter> {
    match level.to_lowercase().as_str() {
        "trace" => Some(log::LevelFilter::Trace),
        "debug" => Some(log::LevelFilter::Debug),
        "info" => Some(log::LevelFilter::Info),
        "warn" | "warning" => Some(log::LevelFilter::Warn),
        "error" => Some(log::LevelFilter::Error),
        "off" => Some(log::LevelFilter::Off),
        _ => None,
    }
}
