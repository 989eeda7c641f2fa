//! RPC client side: a data source whose collections live on a remote server

use super::protocol::{Handshake, RpcMethod, RpcParams, RpcRequest};
use crate::collection::{upgrade, ActionFormField, ActionResult, Caller, Chart, Collection, DataSource};
use crate::error::{ConfigurationError, Result, TransportError};
use crate::query::{AggregateResult, Aggregation, Filter, PaginatedFilter, Projection};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, DataSourceSchema};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Sends calls for one connection definition to one server
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    definition: Value,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, definition: Value) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), definition }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        collection: Option<&str>,
        method: RpcMethod,
        params: RpcParams,
    ) -> Result<T> {
        let request = RpcRequest {
            data_source: self.definition.clone(),
            collection: collection.map(str::to_string),
            method: method.to_string(),
            params,
        };
        log::debug!("RPC {} {} -> {}", method, collection.unwrap_or("-"), self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| TransportError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
            .into());
        }

        serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()).into())
    }
}

/// Remote data source, built from the server's handshake
pub struct RpcDataSource {
    client: Arc<RpcClient>,
    schema: DataSourceSchema,
    collections: BTreeMap<String, Arc<RpcCollection>>,
}

impl RpcDataSource {
    /// Handshake with the server at `url` and mirror the advertised collections
    pub async fn connect(url: impl Into<String>, definition: Value) -> Result<Arc<Self>> {
        let client = Arc::new(RpcClient::new(url, definition));
        let handshake: Handshake = client.call(None, RpcMethod::Handshake, RpcParams::default()).await?;
        log::info!(
            "🔌 Connected to {} ({} collection(s))",
            client.url(),
            handshake.collection_schemas.len()
        );

        Ok(Arc::new_cyclic(|this: &Weak<Self>| {
            let collections = handshake
                .collection_schemas
                .into_iter()
                .map(|(name, schema)| {
                    let collection = RpcCollection {
                        name: name.clone(),
                        schema,
                        client: client.clone(),
                        data_source: this.clone(),
                    };
                    (name, Arc::new(collection))
                })
                .collect();
            Self { client: client.clone(), schema: handshake.data_source_schema, collections }
        }))
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl DataSource for RpcDataSource {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        self.collections.values().map(|c| c.clone() as Arc<dyn Collection>).collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        self.collections
            .get(name)
            .map(|c| c.clone() as Arc<dyn Collection>)
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }

    fn schema(&self) -> DataSourceSchema {
        self.schema.clone()
    }

    async fn render_chart(&self, caller: &Caller, name: &str) -> Result<Chart> {
        let params = RpcParams { name: Some(name.to_string()), ..RpcParams::new(caller) };
        self.client.call(None, RpcMethod::RenderChart, params).await
    }
}

/// Forwards every collection call to the server
pub struct RpcCollection {
    name: String,
    schema: CollectionSchema,
    client: Arc<RpcClient>,
    data_source: Weak<RpcDataSource>,
}

impl RpcCollection {
    async fn call<T: DeserializeOwned>(&self, method: RpcMethod, params: RpcParams) -> Result<T> {
        self.client.call(Some(&self.name), method, params).await
    }
}

#[async_trait]
impl Collection for RpcCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> CollectionSchema {
        self.schema.clone()
    }

    fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        Ok(upgrade(&self.data_source)?)
    }

    async fn list(&self, caller: &Caller, filter: &PaginatedFilter, projection: &Projection) -> Result<Vec<RecordData>> {
        let params = RpcParams { projection: Some(projection.clone()), ..RpcParams::new(caller) }.with_filter(filter.clone());
        self.call(RpcMethod::List, params).await
    }

    async fn create(&self, caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        let params = RpcParams { data: Some(records), ..RpcParams::new(caller) };
        self.call(RpcMethod::Create, params).await
    }

    async fn update(&self, caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()> {
        let params = RpcParams { patch: Some(patch), ..RpcParams::new(caller) }.with_filter(filter.clone());
        self.call::<Value>(RpcMethod::Update, params).await.map(|_| ())
    }

    async fn delete(&self, caller: &Caller, filter: &Filter) -> Result<()> {
        let params = RpcParams::new(caller).with_filter(filter.clone());
        self.call::<Value>(RpcMethod::Delete, params).await.map(|_| ())
    }

    async fn aggregate(
        &self,
        caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>> {
        let params = RpcParams { aggregation: Some(aggregation.clone()), limit, ..RpcParams::new(caller) }
            .with_filter(filter.clone());
        self.call(RpcMethod::Aggregate, params).await
    }

    async fn execute(&self, caller: &Caller, action: &str, form_values: RecordData, filter: &Filter) -> Result<ActionResult> {
        let params = RpcParams { name: Some(action.to_string()), form_values: Some(form_values), ..RpcParams::new(caller) }
            .with_filter(filter.clone());
        self.call(RpcMethod::Execute, params).await
    }

    async fn get_form(
        &self,
        caller: &Caller,
        action: &str,
        form_values: Option<RecordData>,
        filter: Option<&Filter>,
    ) -> Result<Vec<ActionFormField>> {
        let mut params = RpcParams { name: Some(action.to_string()), form_values, ..RpcParams::new(caller) };
        if let Some(filter) = filter {
            params = params.with_filter(filter.clone());
        }
        self.call(RpcMethod::GetForm, params).await
    }
}
