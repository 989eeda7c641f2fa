use crate::collection::{Caller, Chart, Collection, DataSource};
use crate::decorators::RenameCollectionDataSource;
use crate::error::{ConfigurationError, Result};
use crate::schema::DataSourceSchema;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Several data sources exposed as one.
///
/// Each added source is wrapped in a [`RenameCollectionDataSource`], so its
/// collections can be renamed on the way in to avoid clashes.
#[derive(Default)]
pub struct CompositeDataSource {
    data_sources: Vec<Arc<dyn DataSource>>,
    chart_owners: BTreeMap<String, usize>,
}

impl CompositeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `data_source`, renaming its collections with `rename` (old name to new name)
    pub fn add_data_source(
        &mut self,
        data_source: Arc<dyn DataSource>,
        rename: Option<BTreeMap<String, String>>,
    ) -> Result<()> {
        let renamed = RenameCollectionDataSource::new(data_source);
        if let Some(rename) = rename {
            renamed.rename_collections(rename)?;
        }

        for collection in renamed.collections() {
            if self.get_collection(collection.name()).is_ok() {
                return Err(ConfigurationError::DuplicateCollection(collection.name().to_string()).into());
            }
        }
        let charts = renamed.schema().charts;
        if let Some(chart) = charts.iter().find(|chart| self.chart_owners.contains_key(*chart)) {
            return Err(ConfigurationError::DuplicateChart(chart.clone()).into());
        }

        let index = self.data_sources.len();
        self.chart_owners.extend(charts.into_iter().map(|chart| (chart, index)));
        self.data_sources.push(renamed);
        Ok(())
    }
}

#[async_trait]
impl DataSource for CompositeDataSource {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        self.data_sources.iter().flat_map(|ds| ds.collections()).collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        self.data_sources
            .iter()
            .find_map(|ds| ds.get_collection(name).ok())
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }

    fn schema(&self) -> DataSourceSchema {
        DataSourceSchema { charts: self.chart_owners.keys().cloned().collect() }
    }

    async fn render_chart(&self, caller: &Caller, name: &str) -> Result<Chart> {
        let owner = self
            .chart_owners
            .get(name)
            .and_then(|index| self.data_sources.get(*index))
            .ok_or_else(|| ConfigurationError::UnknownChart(name.to_string()))?;
        owner.render_chart(caller, name).await
    }
}
