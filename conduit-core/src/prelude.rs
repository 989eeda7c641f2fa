//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use conduit_core::prelude::*;
//! ```

// === Contract ===
pub use crate::collection::{Caller, Collection, DataSource};
pub use crate::record::{CompositeId, RecordData};
pub use crate::schema::{CollectionSchema, ColumnSchema, ColumnType, FieldSchema, RelationSchema};

// === Query IR ===
pub use crate::query::{
    AggregateResult, Aggregation, AggregationOperation, Aggregator, ConditionTree, ConditionTreeFactory,
    DateOperation, Filter, Operator, Page, PaginatedFilter, Projection, Sort,
};

// === Data sources and layers ===
pub use crate::cache::{CacheOrigin, CachedDataSource, ChangeSet};
pub use crate::datasource::{BaseDataSource, CompositeDataSource, DataSourceFactory};
pub use crate::decorators::DecoratorsStack;
pub use crate::memory::MemoryDataSource;
pub use crate::rpc::{DataSourceRegistry, RpcDataSource, RpcServer};

// === Configuration ===
pub use crate::config::ConduitConfig;
pub use crate::logging::init_logging;

// === Errors ===
pub use crate::error::{ConfigurationError, Error, Result, TransportError, ValidationError};
