use crate::collection::{Caller, Chart, Collection, DataSource};
use crate::error::{ConfigurationError, Result};
use crate::schema::DataSourceSchema;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collections registered by name, no charts
#[derive(Default)]
pub struct BaseDataSource {
    collections: BTreeMap<String, Arc<dyn Collection>>,
}

impl BaseDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, collection: Arc<dyn Collection>) -> Result<()> {
        let name = collection.name().to_string();
        if self.collections.contains_key(&name) {
            return Err(ConfigurationError::DuplicateCollection(name).into());
        }
        self.collections.insert(name, collection);
        Ok(())
    }
}

#[async_trait]
impl DataSource for BaseDataSource {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        self.collections.values().cloned().collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }

    fn schema(&self) -> DataSourceSchema {
        DataSourceSchema::default()
    }

    async fn render_chart(&self, _caller: &Caller, name: &str) -> Result<Chart> {
        Err(ConfigurationError::UnknownChart(name.to_string()).into())
    }
}
