//! Client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::net::call_log::DEFAULT_CAPACITY;

pub const DEFAULT_BASE_URL: &str = "https://bilcobe-2.onrender.com";
pub const DEFAULT_STATE_DIR: &str = ".bilco";
pub const DEFAULT_STATE_FILE: &str = "state.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash.
    pub base_url: String,
    pub state_file: PathBuf,
    pub log_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            state_file: default_state_file(std::env::var_os("HOME").map(PathBuf::from)),
            log_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `BILCO_BASE_URL`: backend origin, default `https://bilcobe-2.onrender.com`
    /// - `BILCO_STATE_FILE`: storage file, default `$HOME/.bilco/state.json`
    /// - `BILCO_LOG_CAPACITY`: call-log capacity, default 100
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("BILCO_BASE_URL") {
            config.base_url = parse_base_url(&raw)?;
        }
        if let Some(path) = std::env::var_os("BILCO_STATE_FILE") {
            config.state_file = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var("BILCO_LOG_CAPACITY") {
            config.log_capacity = parse_capacity(&raw)?;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.trim_end_matches('/').clone_into(&mut self.base_url);
        self
    }
}

/// Normalize a base origin: must be http(s), trailing slashes dropped.
pub fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            var: "BILCO_BASE_URL",
            message: format!("expected http:// or https:// origin, got '{raw}'"),
        });
    }
    Ok(trimmed.to_owned())
}

fn parse_capacity(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid { var: "BILCO_LOG_CAPACITY", message: "must be at least 1".into() }),
        Ok(capacity) => Ok(capacity),
        Err(e) => Err(ConfigError::Invalid { var: "BILCO_LOG_CAPACITY", message: e.to_string() }),
    }
}

fn default_state_file(home: Option<PathBuf>) -> PathBuf {
    home.unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STATE_DIR)
        .join(DEFAULT_STATE_FILE)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
