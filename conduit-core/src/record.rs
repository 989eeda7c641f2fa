//! Records and record helpers

use crate::error::{Result, ValidationError};
use crate::schema::CollectionSchema;
use serde_json::Value;
use std::cmp::Ordering;

/// A record: field name to JSON value. Relation fields hold nested records.
pub type RecordData = serde_json::Map<String, Value>;

/// Primary key values of one record, ordered like [`CollectionSchema::primary_keys`].
pub type CompositeId = Vec<Value>;

/// Extract the composite id of a record
pub fn primary_key(schema: &CollectionSchema, record: &RecordData) -> Result<CompositeId> {
    schema
        .primary_keys()
        .into_iter()
        .map(|pk| match record.get(&pk) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(ValidationError::MissingPrimaryKey(pk).into()),
        })
        .collect()
}

/// Read a possibly nested value (`author:name`) from a record.
///
/// Returns `None` when any hop is absent or is not a nested record.
pub fn field_value<'a>(record: &'a RecordData, path: &str) -> Option<&'a Value> {
    match path.split_once(':') {
        None => record.get(path),
        Some((prefix, rest)) => match record.get(prefix) {
            Some(Value::Object(nested)) => field_value(nested, rest),
            _ => None,
        },
    }
}

/// Equality with numeric normalization, so that `1` equals `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

/// Partial order between two values of the same kind
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used for sorting: nulls first, then booleans, numbers, strings and the rest.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    compare(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}
