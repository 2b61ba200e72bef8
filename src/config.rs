//! Configuration file parser for the watcher binary.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! All keys are individually optional via `#[serde(default)]`, so any
//! subset can be specified.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::feed::FetchOptions;

/// Config files past this size are junk, not configuration.
const MAX_CONFIG_SIZE: u64 = 64 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file too large: {0} bytes")]
    TooLarge(u64),
}

/// Watcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minutes between automatic refreshes. 0 = refresh once and exit.
    pub refresh_interval_minutes: u64,

    /// Whole-request timeout for one document fetch, in seconds.
    pub request_timeout_secs: u64,

    /// Response body cap for one document fetch, in bytes.
    pub max_feed_bytes: usize,

    /// User-Agent header sent with fetches.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = FetchOptions::default();
        Config {
            refresh_interval_minutes: 15,
            request_timeout_secs: defaults.timeout.as_secs(),
            max_feed_bytes: defaults.max_bytes,
            user_agent: concat!("feedwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file; a missing file is defaults.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(ConfigError::TooLarge(metadata.len()));
        }

        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Fetch tunables derived from this configuration.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_feed_bytes,
        }
    }
}
