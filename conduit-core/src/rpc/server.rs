//! RPC server side
//!
//! [`RpcServer::handle`] turns one raw request body into one JSON answer.
//! [`RpcServer::serve`] mounts it on a hyper HTTP/1 listener.

use super::protocol::{Handshake, RpcMethod, RpcParams, RpcRequest};
use super::registry::DataSourceRegistry;
use crate::collection::DataSource;
use crate::config::ServerConfig;
use crate::error::{ConfigurationError, Error, Result};
use crate::query::Projection;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

enum Target {
    /// Data source resolved from each request's definition
    Registry(DataSourceRegistry),
    /// One data source, whatever the definition says
    Fixed(Arc<dyn DataSource>),
}

pub struct RpcServer {
    target: Target,
}

impl RpcServer {
    pub fn new(registry: DataSourceRegistry) -> Self {
        Self { target: Target::Registry(registry) }
    }

    /// Serve `data_source` for every request
    pub fn for_data_source(data_source: Arc<dyn DataSource>) -> Self {
        Self { target: Target::Fixed(data_source) }
    }

    async fn data_source(&self, definition: &Value) -> Result<Arc<dyn DataSource>> {
        match &self.target {
            Target::Registry(registry) => registry.resolve(definition).await,
            Target::Fixed(data_source) => Ok(data_source.clone()),
        }
    }

    /// Decode a raw request body and dispatch it
    pub async fn handle(&self, body: &[u8]) -> Result<Value> {
        let request: RpcRequest = serde_json::from_slice(body)?;
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: RpcRequest) -> Result<Value> {
        let method: RpcMethod = request.method.parse()?;
        let data_source = self.data_source(&request.data_source).await?;
        let params = request.params;
        let caller = &params.caller;

        if !method.targets_collection() {
            log::debug!("RPC {}", method);
            return match method {
                RpcMethod::Handshake => {
                    let handshake = Handshake {
                        data_source_schema: data_source.schema(),
                        collection_schemas: data_source
                            .collections()
                            .iter()
                            .map(|c| (c.name().to_string(), c.schema()))
                            .collect(),
                    };
                    Ok(serde_json::to_value(handshake)?)
                }
                RpcMethod::Schema => Ok(serde_json::to_value(data_source.schema())?),
                _ => {
                    let name = RpcParams::require(&params.name, "name")?;
                    data_source.render_chart(caller, name).await
                }
            };
        }

        let name = RpcParams::require(&request.collection, "collection")?;
        let collection = data_source.get_collection(name)?;
        log::debug!("RPC {} {}", method, name);

        match method {
            RpcMethod::List => {
                let filter = params.filter.clone().unwrap_or_default();
                let projection = match &params.projection {
                    Some(projection) => projection.clone(),
                    None => Projection::columns_of(&collection.schema()),
                };
                Ok(serde_json::to_value(collection.list(caller, &filter, &projection).await?)?)
            }
            RpcMethod::Create => {
                let data = RpcParams::require(&params.data, "data")?.clone();
                Ok(serde_json::to_value(collection.create(caller, data).await?)?)
            }
            RpcMethod::Update => {
                let patch = RpcParams::require(&params.patch, "patch")?.clone();
                collection.update(caller, &params.plain_filter(), patch).await?;
                Ok(Value::Null)
            }
            RpcMethod::Delete => {
                collection.delete(caller, &params.plain_filter()).await?;
                Ok(Value::Null)
            }
            RpcMethod::Aggregate => {
                let aggregation = RpcParams::require(&params.aggregation, "aggregation")?;
                let rows = collection.aggregate(caller, &params.plain_filter(), aggregation, params.limit).await?;
                Ok(serde_json::to_value(rows)?)
            }
            RpcMethod::Execute => {
                let action = RpcParams::require(&params.name, "name")?;
                let form_values = params.form_values.clone().unwrap_or_default();
                collection.execute(caller, action, form_values, &params.plain_filter()).await
            }
            RpcMethod::GetForm => {
                let action = RpcParams::require(&params.name, "name")?;
                let filter = params.filter.clone().map(|f| f.into_filter());
                let fields = collection.get_form(caller, action, params.form_values.clone(), filter.as_ref()).await?;
                Ok(Value::Array(fields))
            }
            other => Err(ConfigurationError::UnsupportedMethod(other.to_string()).into()),
        }
    }

    /// Bind the configured address and serve until the process stops
    pub async fn serve(self: Arc<Self>, config: &ServerConfig) -> anyhow::Result<()> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        log::info!("✅ RPC server listening on http://{}", addr);
        self.serve_on(listener, config.max_body_size).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self: Arc<Self>, listener: TcpListener, max_body_size: usize) -> anyhow::Result<()> {
        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = self.clone();

            tokio::spawn(async move {
                let io = hyper_util::rt::TokioIo::new(stream);

                let service = hyper::service::service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, std::convert::Infallible>(server.handle_http(req, max_body_size).await) }
                });

                if let Err(err) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                    log::error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_http(&self, req: Request<hyper::body::Incoming>, max_body_size: usize) -> Response<Full<Bytes>> {
        if req.method() != Method::POST {
            return text_response(StatusCode::METHOD_NOT_ALLOWED, "Only POST is supported");
        }

        let body = match Limited::new(req.into_body(), max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                return text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => return text_response(StatusCode::BAD_REQUEST, &err.to_string()),
        };

        let answer = self.handle(&body).await.and_then(|value| Ok(serde_json::to_vec(&value)?));
        match answer {
            Ok(json) => {
                let mut response = Response::new(Full::new(Bytes::from(json)));
                response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    log::warn!("RPC call failed: {}", err);
                } else {
                    log::debug!("RPC call rejected: {}", err);
                }
                text_response(status, &err.to_string())
            }
        }
    }
}

/// HTTP status answering a failed call
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) | Error::Configuration(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
        Error::NotSynced { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::Transport(_) => StatusCode::BAD_GATEWAY,
        Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::testing;
    use serde_json::json;

    async fn library_server() -> RpcServer {
        RpcServer::for_data_source(testing::library().await)
    }

    async fn call(server: &RpcServer, request: Value) -> Result<Value> {
        server.handle(&serde_json::to_vec(&request).unwrap()).await
    }

    #[tokio::test]
    async fn test_list_with_filter_and_projection() {
        let server = library_server().await;
        let rows = call(
            &server,
            json!({
                "dataSource": null,
                "collection": "books",
                "method": "list",
                "params": {
                    "filter": {
                        "conditionTree": {"field": "genre", "operator": "equal", "value": "sf"},
                        "sort": [{"field": "year", "ascending": false}],
                        "page": {"skip": 0, "limit": 2}
                    },
                    "projection": ["title", "author:name"]
                }
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            rows,
            json!([
                {"title": "Dune", "author": {"name": "Frank Herbert"}},
                {"title": "Foundation", "author": {"name": "Isaac Asimov"}}
            ])
        );
    }

    #[tokio::test]
    async fn test_handshake_lists_collections() {
        let server = library_server().await;
        let handshake: Handshake =
            serde_json::from_value(call(&server, json!({"dataSource": {}, "method": "handshake"})).await.unwrap())
                .unwrap();

        assert_eq!(handshake.collection_schemas.keys().collect::<Vec<_>>(), vec!["books", "persons"]);
        assert_eq!(handshake.collection_schemas["persons"], testing::persons_schema());
    }

    #[tokio::test]
    async fn test_writes_answer_null() {
        let server = library_server().await;
        let update = json!({
            "dataSource": {},
            "collection": "persons",
            "method": "update",
            "params": {
                "filter": {"conditionTree": {"field": "id", "operator": "equal", "value": 2}},
                "patch": {"age": 66}
            }
        });
        assert_eq!(call(&server, update).await.unwrap(), Value::Null);

        let aggregate = json!({
            "dataSource": {},
            "collection": "persons",
            "method": "aggregate",
            "params": {"aggregation": {"operation": "Sum", "field": "age"}}
        });
        assert_eq!(call(&server, aggregate).await.unwrap(), json!([{"value": 226, "group": {}}]));
    }

    #[tokio::test]
    async fn test_errors() {
        let server = library_server().await;

        let err = call(&server, json!({"dataSource": {}, "collection": "books", "method": "truncate"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::UnsupportedMethod(_))));

        let err = call(&server, json!({"dataSource": {}, "collection": "films", "method": "list"}))
            .await
            .unwrap_err();
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);

        let err = call(&server, json!({"dataSource": {}, "method": "list"})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing RPC parameter 'collection'");

        let bad_filter = json!({
            "dataSource": {},
            "collection": "books",
            "method": "delete",
            "params": {"filter": {"conditionTree": {"field": "pages", "operator": "equal", "value": 1}}}
        });
        let err = call(&server, bad_filter).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::FieldNotFound { .. })));

        assert!(matches!(server.handle(b"not json").await, Err(Error::Serialization(_))));
        assert_eq!(
            status_for(&Error::NotSynced { collection: "books".into() }),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
