//! RPC client configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Endpoint of the remote RPC server
    /// Env: CONDUIT_RPC_URL
    /// Default: "http://localhost:1234"
    pub url: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { url: "http://localhost:1234".to_string() }
    }
}

impl RpcConfig {
    pub fn merge(&mut self, other: Self) {
        self.url = other.url;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = env::var("CONDUIT_RPC_URL") {
            self.url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            bail!("Invalid rpc.url '{}': expected an http:// or https:// URL", self.url);
        }
        Ok(())
    }
}
