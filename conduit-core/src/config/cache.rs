//! Cached data source configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Sync before every read. When disabled, sync is driven by
    /// `sync_interval_secs` or by explicit calls.
    /// Env: CONDUIT_CACHE_SYNC_ON_READ
    /// Default: true
    pub sync_on_read: bool,

    /// Background sync period
    /// Env: CONDUIT_CACHE_SYNC_INTERVAL
    /// Default: None
    pub sync_interval_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { sync_on_read: true, sync_interval_secs: None }
    }
}

impl CacheConfig {
    pub fn merge(&mut self, other: Self) {
        self.sync_on_read = other.sync_on_read;
        self.sync_interval_secs = other.sync_interval_secs;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(enabled) = env::var("CONDUIT_CACHE_SYNC_ON_READ") {
            self.sync_on_read = enabled.parse().unwrap_or(self.sync_on_read);
        }

        if let Ok(interval) = env::var("CONDUIT_CACHE_SYNC_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.sync_interval_secs = Some(secs);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync_interval_secs == Some(0) {
            bail!("Invalid cache.sync_interval_secs: must be greater than 0");
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_secs.map(Duration::from_secs)
    }
}
