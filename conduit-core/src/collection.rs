//! Collection and DataSource contract
//!
//! Every backend and every decorator implements these two traits. Decorators
//! wrap an `Arc<dyn Collection>` / `Arc<dyn DataSource>` and expose the same
//! contract, so layers stack without knowing about each other.

use crate::error::{ConfigurationError, Result};
use crate::query::{AggregateResult, Aggregation, Filter, PaginatedFilter, Projection};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, DataSourceSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};

/// Identity and context of whoever issued the operation.
///
/// Threaded through every call and never inspected by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Caller(Value);

impl Caller {
    pub fn new(context: Value) -> Self {
        Self(context)
    }

    pub fn context(&self) -> &Value {
        &self.0
    }
}

/// Rendered chart, opaque to this crate
pub type Chart = Value;

/// Result of an action, opaque to this crate
pub type ActionResult = Value;

/// Form field description, opaque to this crate
pub type ActionFormField = Value;

#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Advertised schema. Decorators compute it on each call.
    fn schema(&self) -> CollectionSchema;

    /// Data source this collection belongs to, used to resolve relations
    fn data_source(&self) -> Result<Arc<dyn DataSource>>;

    async fn list(
        &self,
        caller: &Caller,
        filter: &PaginatedFilter,
        projection: &Projection,
    ) -> Result<Vec<RecordData>>;

    async fn create(&self, caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>>;

    async fn update(&self, caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()>;

    async fn delete(&self, caller: &Caller, filter: &Filter) -> Result<()>;

    async fn aggregate(
        &self,
        caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>>;

    async fn execute(
        &self,
        _caller: &Caller,
        action: &str,
        _form_values: RecordData,
        _filter: &Filter,
    ) -> Result<ActionResult> {
        Err(ConfigurationError::UnknownAction {
            collection: self.name().to_string(),
            action: action.to_string(),
        }
        .into())
    }

    async fn get_form(
        &self,
        _caller: &Caller,
        _action: &str,
        _form_values: Option<RecordData>,
        _filter: Option<&Filter>,
    ) -> Result<Vec<ActionFormField>> {
        Ok(Vec::new())
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    fn collections(&self) -> Vec<Arc<dyn Collection>>;

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>>;

    fn schema(&self) -> DataSourceSchema;

    async fn render_chart(&self, caller: &Caller, name: &str) -> Result<Chart>;
}

/// Upgrade a back-reference to an owning data source
pub(crate) fn upgrade<T: ?Sized>(weak: &Weak<T>) -> Result<Arc<T>> {
    weak.upgrade().ok_or_else(|| ConfigurationError::DataSourceDropped.into())
}
