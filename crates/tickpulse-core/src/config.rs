//! Polygon connection settings loaded from the environment.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `TICKPULSE_POLYGON_API_KEY` or `POLYGON_API_KEY` | yes | |
//! | `POLYGON_BASE_URL` | no | `https://api.polygon.io` |
//! | `POLYGON_TIMEOUT_MS` | no | `10000` |
//!
//! A `.env` file in the working directory is read first; variables already
//! present in the process environment win over it.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;

use thiserror::Error;

use crate::http_client::DEFAULT_TIMEOUT_MS;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

const API_KEY_VARS: [&str; 2] = ["TICKPULSE_POLYGON_API_KEY", "POLYGON_API_KEY"];
const BASE_URL_VAR: &str = "POLYGON_BASE_URL";
const TIMEOUT_VAR: &str = "POLYGON_TIMEOUT_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("POLYGON_API_KEY not found in environment or .env file")]
    MissingApiKey,
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
    #[error("failed to read env file {path}: {message}")]
    EnvFile { path: String, message: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct PolygonConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl PolygonConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings from a specific env file without touching the process
    /// environment. Values in the file take precedence over the environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let env_file_error = |message: String| ConfigError::EnvFile {
            path: path.display().to_string(),
            message,
        };

        let mut values = HashMap::new();
        let entries = dotenvy::from_path_iter(path).map_err(|e| env_file_error(e.to_string()))?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| env_file_error(e.to_string()))?;
            values.insert(key, value);
        }

        Self::from_lookup(|name| {
            values
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_owned())
            .find(|value| !value.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = match lookup(BASE_URL_VAR) {
            Some(value) if !value.trim().is_empty() => {
                let trimmed = value.trim().trim_end_matches('/');
                if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        name: BASE_URL_VAR,
                        value,
                    });
                }
                trimmed.to_owned()
            }
            _ => String::from(DEFAULT_BASE_URL),
        };

        let timeout_ms = match lookup(TIMEOUT_VAR) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|timeout| *timeout > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: TIMEOUT_VAR,
                    value,
                })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            api_key,
            base_url,
            timeout_ms,
        })
    }
}

impl Debug for PolygonConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolygonConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
