//! Logging configuration

use crate::logging::{LogFormat, LogLevel};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: CONDUIT_LOG_LEVEL
    /// Default: info
    pub level: LogLevel,

    /// `human` or `json`
    /// Env: CONDUIT_LOG_FORMAT
    /// Default: human
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("CONDUIT_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.level = level,
                Err(e) => log::warn!("Ignoring CONDUIT_LOG_LEVEL: {}", e),
            }
        }

        if let Ok(format) = env::var("CONDUIT_LOG_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "json" => self.format = LogFormat::Json,
                "human" => self.format = LogFormat::Human,
                other => log::warn!("Ignoring CONDUIT_LOG_FORMAT: unknown format '{}'", other),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
