//! Conduit - Core
//!
//! A backend-agnostic query layer: one collection contract, a small query
//! language to drive it, and composable layers on top.
//!
//! # Overview
//!
//! Every backend exposes its entities as [`Collection`]s grouped in a
//! [`DataSource`]. Callers describe what they want with the query IR
//! (condition trees, filters, projections, aggregations) and the backend
//! answers. Decorators wrap a data source and present the same contract,
//! so renames and emulated operators stack without the backend knowing.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use conduit_core::prelude::*;
//! use serde_json::json;
//!
//! # async fn run(source: std::sync::Arc<dyn DataSource>) -> conduit_core::Result<()> {
//! let books = source.get_collection("books")?;
//! let filter = PaginatedFilter::from_tree(ConditionTree::leaf("year", Operator::GreaterThan, json!(1960)))
//!     .with_sort(Sort::ascending("title"));
//! let rows = books.list(&Caller::default(), &filter, &Projection::new(["title", "author:name"])).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`query`] - Condition trees, filters, projection, sort, page, aggregation
//! - [`validation`] - Checks a query against the schema it targets
//! - [`collection`] - The `Collection` / `DataSource` contract
//! - [`datasource`] - Base and composite data sources, factories
//! - [`memory`] - In-memory store implementing the contract
//! - [`decorators`] - Rename collection, rename field, operator emulation
//! - [`cache`] - Mirror kept current from a remote change feed
//! - [`rpc`] - JSON over HTTP client and server
//! - [`config`] / [`logging`] - Layered configuration and `env_logger` setup

pub mod cache;
pub mod collection;
pub mod config; // Configuration system with TOML support
pub mod datasource;
pub mod decorators;
pub mod error;
pub mod logging;
pub mod memory;
pub mod patterns; // LIKE-style pattern matching
pub mod query;
pub mod record;
pub mod rpc;
pub mod schema;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

// Prelude module for convenient imports
pub mod prelude;

// Re-exports of main types and traits
pub use collection::{Caller, Collection, DataSource};
pub use error::{ConfigurationError, Error, Result, TransportError, ValidationError};
pub use record::{CompositeId, RecordData};
