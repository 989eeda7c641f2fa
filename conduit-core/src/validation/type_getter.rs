//! Runtime type of a filter value, in the context of a column type

use crate::schema::ColumnType;
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Boolean,
    Number,
    String,
    Date,
    Dateonly,
    Timeonly,
    Uuid,
    Enum,
    Point,
    Json,
    EmptyArray,
    ArrayOfBoolean,
    ArrayOfNumber,
    ArrayOfString,
    ArrayOfUuid,
    /// Array mixing several kinds of values
    Unknown,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct TypeGetter;

impl TypeGetter {
    pub fn get(value: &Value, context: ColumnType) -> ValueType {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(s) => Self::string_type(s, context),
            Value::Array(items) => Self::array_type(items, context),
            Value::Object(_) => ValueType::Json,
        }
    }

    fn string_type(value: &str, context: ColumnType) -> ValueType {
        match context {
            ColumnType::Enum => ValueType::Enum,
            ColumnType::Uuid if is_uuid(value) => ValueType::Uuid,
            ColumnType::Date if is_datetime(value) || is_date(value) => ValueType::Date,
            ColumnType::Dateonly if is_date(value) => ValueType::Dateonly,
            ColumnType::Timeonly if is_time(value) => ValueType::Timeonly,
            _ => ValueType::String,
        }
    }

    fn array_type(items: &[Value], context: ColumnType) -> ValueType {
        if items.is_empty() {
            return ValueType::EmptyArray;
        }
        if items.iter().all(Value::is_number) {
            return if context == ColumnType::Point && items.len() == 2 {
                ValueType::Point
            } else {
                ValueType::ArrayOfNumber
            };
        }
        if items.iter().all(Value::is_boolean) {
            return ValueType::ArrayOfBoolean;
        }
        if items.iter().all(Value::is_string) {
            let all_uuids = items.iter().filter_map(Value::as_str).all(is_uuid);
            return if context == ColumnType::Uuid && all_uuids {
                ValueType::ArrayOfUuid
            } else {
                ValueType::ArrayOfString
            };
        }
        ValueType::Unknown
    }
}

fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

fn is_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_time(value: &str) -> bool {
    ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"]
        .iter()
        .any(|format| NaiveTime::parse_from_str(value, format).is_ok())
}
