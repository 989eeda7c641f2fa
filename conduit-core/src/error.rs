//! Error types shared by every layer of the query pipeline.
//!
//! Errors are split by who is at fault:
//!
//! - [`ValidationError`]: the caller sent a query the target schema cannot answer
//! - [`ConfigurationError`]: the pipeline itself was assembled or invoked incorrectly
//! - [`TransportError`]: the RPC hop failed or returned garbage
//!
//! All of them fold into the crate-level [`Error`].

use crate::query::Operator;
use crate::schema::ColumnType;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Collection \"{collection}\" is not synched yet. Call \"sync\" first.")]
    NotSynced { collection: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A query does not fit the schema it targets
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field '{field}' not found on collection '{collection}'")]
    FieldNotFound { field: String, collection: String },

    #[error("Unexpected field type: '{collection}.{field}' (found '{found}' expected '{expected}')")]
    UnexpectedFieldType { collection: String, field: String, found: String, expected: String },

    #[error(
        "The given operator '{operator}' is not allowed with the columnType schema: '{column_type}'.\nThe allowed types are: [{allowed}]"
    )]
    OperatorNotAllowedForColumnType { operator: Operator, column_type: ColumnType, allowed: String },

    #[error("The given operator '{operator}' is not supported by the field: '{field}'.")]
    UnsupportedOperator { field: String, operator: Operator },

    #[error(
        "The given value attribute '{value} (type: {value_type})' has an unexpected value for the given operator '{operator}'.\nThe allowed types of the field value are: [{allowed}]."
    )]
    ValueNotAllowedForOperator { value: String, value_type: String, operator: Operator, allowed: String },

    #[error(
        "The given value attribute '{value} (type: {value_type})' is not allowed with the columnType schema '{column_type}'.\nThe allowed types are: [{allowed}]."
    )]
    ValueNotAllowedForColumnType { value: String, value_type: String, column_type: ColumnType, allowed: String },

    #[error("The given enum value(s) [{given}] is not listed in [{allowed}]")]
    EnumValueNotAllowed { given: String, allowed: String },

    #[error("Two or more conditions needed for aggregation (got {0})")]
    TooFewConditions(usize),

    #[error("Cannot nest conditions on a filter using a search or a segment")]
    NestedSearch,

    #[error("Segment '{segment}' is not declared on collection '{collection}'")]
    UnknownSegment { segment: String, collection: String },

    #[error("Cannot unnest '{field}': it is not a relation path")]
    NotNested { field: String },

    #[error("Invalid aggregation: {0}")]
    InvalidAggregation(String),

    #[error("Record is missing primary key '{0}'")]
    MissingPrimaryKey(String),

    #[error("Composite id {given} does not match the primary key [{expected}]")]
    InvalidCompositeId { given: String, expected: String },

    #[error("A record with id {0} already exists")]
    DuplicatePrimaryKey(String),

    #[error("Field '{field}' of collection '{collection}' is read-only")]
    ReadOnlyField { field: String, collection: String },
}

/// The pipeline was wired or driven incorrectly
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Operator replacement cycle: {}", .chain.join(" -> "))]
    RewriteCycle { chain: Vec<String> },

    #[error("Chart '{0}' is already defined in datasource.")]
    DuplicateChart(String),

    #[error("Chart '{0}' is not defined in datasource.")]
    UnknownChart(String),

    #[error("Collection '{0}' not found.")]
    CollectionNotFound(String),

    #[error("Collection '{0}' already defined in datasource")]
    DuplicateCollection(String),

    #[error("Action '{action}' is not defined on collection '{collection}'")]
    UnknownAction { collection: String, action: String },

    #[error("Invalid (null) aggregator.")]
    NullAggregator,

    #[error("Invalid (null) condition.")]
    NullCondition,

    #[error("Invalid condition tree: {0}")]
    InvalidConditionTree(String),

    #[error("Cannot override operators on collection '{collection}': {reason}")]
    InvalidOperatorOverride { collection: String, reason: String },

    #[error("Cannot rename '{from}' to '{to}': {reason}")]
    InvalidRename { from: String, to: String, reason: String },

    #[error("Collection '{0}' must declare at least one primary key")]
    MissingPrimaryKey(String),

    #[error("Unsupported data source type: '{0}'")]
    UnsupportedDataSource(String),

    #[error("Unsupported method '{0}'")]
    UnsupportedMethod(String),

    #[error("Missing RPC parameter '{0}'")]
    MissingParameter(String),

    #[error("Data source has been dropped")]
    DataSourceDropped,
}

/// The RPC hop failed
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("RPC request failed: {0}")]
    Request(String),

    #[error("RPC call returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid RPC payload: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_cycle_lists_the_whole_chain() {
        let err = ConfigurationError::RewriteCycle {
            chain: vec![
                "books.title[contains]".to_string(),
                "books.title[starts_with]".to_string(),
                "books.title[contains]".to_string(),
            ],
        };

        assert_eq!(
            err.to_string(),
            "Operator replacement cycle: books.title[contains] -> books.title[starts_with] -> books.title[contains]"
        );
    }

    #[test]
    fn validation_errors_fold_into_crate_error() {
        let err: Error = ValidationError::TooFewConditions(1).into();
        assert!(matches!(err, Error::Validation(ValidationError::TooFewConditions(1))));
    }
}
