use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use conduit_core::config::ConduitConfig;
use conduit_core::logging::init_logging;
use conduit_core::rpc::{DataSourceRegistry, RpcServer};
use serde_json::Value;

/// Resolve configuration, apply command line overrides and start the RPC server.
///
/// Without `definition`, each request names its own data source. With it,
/// every request is served by the data source that file describes.
pub async fn run(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    definition: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, host, port)?;
    init_logging(&config.logging)?;

    let registry = DataSourceRegistry::with_builtin_factories();
    log::info!("🚀 Conduit RPC server starting (data source types: {})", registry.kinds().join(", "));

    let server = match definition {
        Some(path) => {
            let definition = read_definition(path)?;
            let data_source = registry
                .resolve(&definition)
                .await
                .with_context(|| format!("Failed to build data source from {}", path.display()))?;
            log::info!("   ✓ Serving {} collection(s) from {}", data_source.collections().len(), path.display());
            RpcServer::for_data_source(data_source)
        }
        None => RpcServer::new(registry),
    };

    Arc::new(server).serve(&config.server).await
}

/// Configuration file, then environment, then command line flags
pub fn load_config(path: &Path, host: Option<String>, port: Option<u16>) -> Result<ConduitConfig> {
    let mut config = ConduitConfig::load_from(path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;
    Ok(config)
}

pub fn read_definition(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data source definition: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse data source definition: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conduit.toml");
        std::fs::write(&path, "[server]\nhost = \"0.0.0.0\"\nport = 9000\n").unwrap();

        let config = load_config(&path, None, Some(9100)).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);

        assert!(load_config(&path, None, Some(0)).is_err());
    }

    #[test]
    fn definition_must_be_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("library.json");
        std::fs::write(&path, r#"{"type": "memory", "collections": {}}"#).unwrap();
        assert_eq!(read_definition(&path).unwrap()["type"], "memory");

        std::fs::write(&path, "type = memory").unwrap();
        let err = read_definition(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse data source definition"));
    }
}
