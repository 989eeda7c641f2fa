//! Data source instances keyed by their connection definition

use crate::collection::DataSource;
use crate::datasource::DataSourceFactory;
use crate::error::{ConfigurationError, Result};
use crate::memory::MemoryDataSourceFactory;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

type Instance = Arc<OnceCell<Arc<dyn DataSource>>>;

/// Builds each distinct definition once and keeps the instance for the
/// lifetime of the process
#[derive(Default)]
pub struct DataSourceRegistry {
    factories: HashMap<String, Arc<dyn DataSourceFactory>>,
    instances: Mutex<HashMap<String, Instance>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry knowing the built-in `memory` type
    pub fn with_builtin_factories() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MemoryDataSourceFactory));
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn DataSourceFactory>) {
        self.factories.insert(factory.kind().to_string(), factory);
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Instance for `definition`, created on first use.
    ///
    /// Concurrent first calls for the same definition share one `create`.
    pub async fn resolve(&self, definition: &Value) -> Result<Arc<dyn DataSource>> {
        let key = definition_key(definition)?;
        let cell = {
            let mut instances = self.instances.lock().await;
            instances.entry(key.clone()).or_default().clone()
        };

        match cell.get_or_try_init(|| self.create(definition, &key)).await {
            Ok(instance) => Ok(instance.clone()),
            Err(err) => {
                let mut instances = self.instances.lock().await;
                if instances.get(&key).is_some_and(|cell| !cell.initialized()) {
                    instances.remove(&key);
                }
                Err(err)
            }
        }
    }

    async fn create(&self, definition: &Value, key: &str) -> Result<Arc<dyn DataSource>> {
        let kind = definition
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigurationError::MissingParameter("dataSource.type".to_string()))?;
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ConfigurationError::UnsupportedDataSource(kind.to_string()))?;

        log::info!("🧱 Creating '{}' data source {}", kind, &key[..12]);
        factory.create(definition).await
    }

    pub async fn instance_count(&self) -> usize {
        let instances = self.instances.lock().await;
        instances.values().filter(|cell| cell.initialized()).count()
    }
}

/// SHA-256 of the key-sorted JSON encoding, hex encoded
pub fn definition_key(definition: &Value) -> Result<String> {
    let canonical = serde_json::to_vec(&canonicalize(definition))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<(&String, &Value)> = object.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> =
                entries.into_iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
