//! Wire format of the RPC transport
//!
//! One JSON request per call:
//!
//! ```json
//! {"dataSource": {...}, "collection": "books", "method": "list", "params": {...}}
//! ```
//!
//! The response body is the raw method result.

use crate::collection::Caller;
use crate::error::{ConfigurationError, Error, Result};
use crate::query::{Aggregation, Filter, PaginatedFilter, Projection};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, DataSourceSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    Handshake,
    Schema,
    RenderChart,
    List,
    Create,
    Update,
    Delete,
    Aggregate,
    Execute,
    GetForm,
}

impl RpcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::Handshake => "handshake",
            RpcMethod::Schema => "schema",
            RpcMethod::RenderChart => "renderChart",
            RpcMethod::List => "list",
            RpcMethod::Create => "create",
            RpcMethod::Update => "update",
            RpcMethod::Delete => "delete",
            RpcMethod::Aggregate => "aggregate",
            RpcMethod::Execute => "execute",
            RpcMethod::GetForm => "getForm",
        }
    }

    /// Methods addressed to a collection rather than to the data source
    pub fn targets_collection(&self) -> bool {
        !matches!(self, RpcMethod::Handshake | RpcMethod::Schema | RpcMethod::RenderChart)
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RpcMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "handshake" => RpcMethod::Handshake,
            "schema" => RpcMethod::Schema,
            "renderChart" => RpcMethod::RenderChart,
            "list" => RpcMethod::List,
            "create" => RpcMethod::Create,
            "update" => RpcMethod::Update,
            "delete" => RpcMethod::Delete,
            "aggregate" => RpcMethod::Aggregate,
            "execute" => RpcMethod::Execute,
            "getForm" => RpcMethod::GetForm,
            other => return Err(ConfigurationError::UnsupportedMethod(other.to_string()).into()),
        })
    }
}

/// Arguments of a call. Which ones are read depends on the method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcParams {
    #[serde(default)]
    pub caller: Caller,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PaginatedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<RecordData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<RecordData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Chart name for `renderChart`, action name for `execute` and `getForm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<RecordData>,
}

impl RpcParams {
    pub fn new(caller: &Caller) -> Self {
        Self { caller: caller.clone(), ..Self::default() }
    }

    pub fn with_filter(self, filter: impl Into<PaginatedFilter>) -> Self {
        Self { filter: Some(filter.into()), ..self }
    }

    /// Filter without sort and page, the default when none was sent
    pub fn plain_filter(&self) -> Filter {
        self.filter.clone().map(PaginatedFilter::into_filter).unwrap_or_default()
    }

    pub fn require<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T> {
        value.as_ref().ok_or_else(|| ConfigurationError::MissingParameter(name.to_string()).into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    /// Connection definition of the target data source.
    ///
    /// A server bound to one data source ignores it.
    #[serde(default)]
    pub data_source: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: RpcParams,
}

/// Answer to `handshake`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub data_source_schema: DataSourceSchema,
    pub collection_schemas: BTreeMap<String, CollectionSchema>,
}
