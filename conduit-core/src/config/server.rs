//! RPC server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening address
    /// Env: CONDUIT_HOST
    /// Default: "127.0.0.1"
    pub host: String,

    /// Listening port
    /// Env: CONDUIT_PORT
    /// Default: 1234
    pub port: u16,

    /// Maximum request body size in bytes
    /// Env: CONDUIT_MAX_BODY_SIZE
    /// Default: 52428800 (50MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 1234, max_body_size: 50 * 1024 * 1024 }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.host = other.host;
        self.port = other.port;
        self.max_body_size = other.max_body_size;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(host) = env::var("CONDUIT_HOST") {
            self.host = host;
        }

        if let Ok(port) = env::var("CONDUIT_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(size) = env::var("CONDUIT_MAX_BODY_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_body_size = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("Invalid port: port must be between 1 and 65535");
        }

        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        if self.max_body_size == 0 {
            bail!("Invalid max_body_size: must be greater than 0");
        }

        Ok(())
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(ServerConfig::default().validate().is_ok());

        let cfg = ServerConfig { port: 0, ..Default::default() };
        assert!(cfg.validate().unwrap_err().to_string().contains("Invalid port"));

        let cfg = ServerConfig { max_body_size: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_apply_env_vars() {
        let mut cfg = ServerConfig::default();
        std::env::set_var("CONDUIT_PORT", "4321");
        std::env::set_var("CONDUIT_MAX_BODY_SIZE", "not-a-number");
        cfg.apply_env_vars();
        std::env::remove_var("CONDUIT_PORT");
        std::env::remove_var("CONDUIT_MAX_BODY_SIZE");

        assert_eq!(cfg.port, 4321);
        assert_eq!(cfg.max_body_size, 50 * 1024 * 1024);
        assert_eq!(cfg.address(), "127.0.0.1:4321");
    }
}
