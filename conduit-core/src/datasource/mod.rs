//! Data source containers
//!
//! - [`BaseDataSource`]: a plain registry of collections
//! - [`CompositeDataSource`]: merges several data sources into one
//! - [`DataSourceFactory`]: builds a data source from a JSON connection definition

mod base;
mod composite;

pub use base::BaseDataSource;
pub use composite::CompositeDataSource;

use crate::collection::DataSource;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Builds data sources of one `type` from their connection definition.
///
/// The RPC server keeps one instance per distinct definition, so `create`
/// runs at most once per definition.
#[async_trait]
pub trait DataSourceFactory: Send + Sync {
    /// Value of the definition's `type` key this factory answers to
    fn kind(&self) -> &str;

    async fn create(&self, definition: &Value) -> Result<Arc<dyn DataSource>>;
}
