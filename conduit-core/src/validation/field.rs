//! Field path resolution and record value checks

use super::rules;
use super::type_getter::{TypeGetter, ValueType};
use crate::collection::Collection;
use crate::error::{Result, ValidationError};
use crate::schema::{ColumnSchema, ColumnType, FieldSchema};
use serde_json::Value;

pub struct FieldValidator;

impl FieldValidator {
    /// Resolve a field path to the column it designates.
    ///
    /// Each `prefix:` hop must be a ManyToOne or OneToOne relation; the last
    /// segment must be a column.
    pub fn validate(collection: &dyn Collection, path: &str) -> Result<ColumnSchema> {
        let schema = collection.schema();
        let not_found = |field: &str| ValidationError::FieldNotFound {
            field: field.to_string(),
            collection: collection.name().to_string(),
        };

        match path.split_once(':') {
            None => match schema.fields.get(path) {
                Some(FieldSchema::Column(column)) => Ok(column.clone()),
                Some(other) => Err(ValidationError::UnexpectedFieldType {
                    collection: collection.name().to_string(),
                    field: path.to_string(),
                    found: other.type_name(),
                    expected: "Column".to_string(),
                }
                .into()),
                None => Err(not_found(path).into()),
            },
            Some((prefix, rest)) => match schema.fields.get(prefix) {
                Some(FieldSchema::Relation(relation)) if relation.kind.is_to_one() => {
                    let foreign = collection.data_source()?.get_collection(&relation.foreign_collection)?;
                    Self::validate(foreign.as_ref(), rest)
                }
                Some(other) => Err(ValidationError::UnexpectedFieldType {
                    collection: collection.name().to_string(),
                    field: prefix.to_string(),
                    found: other.type_name(),
                    expected: "ManyToOne or OneToOne".to_string(),
                }
                .into()),
                None => Err(not_found(prefix).into()),
            },
        }
    }

    /// Check a value written into a column
    pub fn validate_value(column: &ColumnSchema, value: &Value) -> Result<()> {
        if value.is_null() || column.column_type == ColumnType::Json {
            return Ok(());
        }

        let value_type = TypeGetter::get(value, column.column_type);
        let allowed: Vec<ValueType> = rules::value_types_for_column_type(column.column_type)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|t| !is_array(*t))
            .collect();

        if !allowed.contains(&value_type) {
            return Err(ValidationError::ValueNotAllowedForColumnType {
                value: value.to_string(),
                value_type: value_type.to_string(),
                column_type: column.column_type,
                allowed: rules::join(allowed),
            }
            .into());
        }

        Self::validate_enum(column, value)
    }

    /// Every string in `value` must be listed in the column's enum values
    pub fn validate_enum(column: &ColumnSchema, value: &Value) -> Result<()> {
        if column.column_type != ColumnType::Enum {
            return Ok(());
        }
        let allowed = column.enum_values.clone().unwrap_or_default();
        let given: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };

        if given.iter().all(|v| allowed.iter().any(|a| a == v)) {
            return Ok(());
        }
        Err(ValidationError::EnumValueNotAllowed { given: rules::join(given), allowed: rules::join(allowed) }.into())
    }
}

fn is_array(value_type: ValueType) -> bool {
    matches!(
        value_type,
        ValueType::EmptyArray
            | ValueType::ArrayOfBoolean
            | ValueType::ArrayOfNumber
            | ValueType::ArrayOfString
            | ValueType::ArrayOfUuid
    )
}
