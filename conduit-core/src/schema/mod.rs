//! Schema model
//!
//! Describes what a collection looks like from the outside: its columns, the
//! operators each column can be filtered with, its relations, actions and
//! segments. Schemas travel over the wire unchanged (camelCase JSON) during
//! the RPC handshake.

pub mod relations;

pub use relations::{RelationSchema, RelationType};

use crate::query::Operator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Primitive type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    Date,
    Dateonly,
    Enum,
    Json,
    Number,
    Point,
    String,
    Timeonly,
    Uuid,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Rule a column value must satisfy on write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Column field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub column_type: ColumnType,
    /// Operators the owning collection answers natively. A set in memory, an array on the wire.
    #[serde(default)]
    pub filter_operators: BTreeSet<Operator>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default = "default_sortable")]
    pub is_sortable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

fn default_sortable() -> bool {
    true
}

impl ColumnSchema {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            filter_operators: BTreeSet::new(),
            is_primary_key: false,
            is_read_only: false,
            is_sortable: true,
            validation: Vec::new(),
            default_value: None,
            enum_values: None,
        }
    }

    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.filter_operators.extend(operators);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// A field is either a column or a relation to another collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TaggedField", into = "TaggedField")]
pub enum FieldSchema {
    Column(ColumnSchema),
    Relation(RelationSchema),
}

/// Wire shape of a field: `{"type": "Column" | "ManyToOne" | ..., ...}`
#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum TaggedField {
    Column(ColumnSchema),
    ManyToOne(RelationSchema),
    OneToOne(RelationSchema),
    OneToMany(RelationSchema),
    ManyToMany(RelationSchema),
}

impl From<TaggedField> for FieldSchema {
    fn from(field: TaggedField) -> Self {
        let (kind, mut relation) = match field {
            TaggedField::Column(column) => return FieldSchema::Column(column),
            TaggedField::ManyToOne(r) => (RelationType::ManyToOne, r),
            TaggedField::OneToOne(r) => (RelationType::OneToOne, r),
            TaggedField::OneToMany(r) => (RelationType::OneToMany, r),
            TaggedField::ManyToMany(r) => (RelationType::ManyToMany, r),
        };
        relation.kind = kind;
        FieldSchema::Relation(relation)
    }
}

impl From<FieldSchema> for TaggedField {
    fn from(field: FieldSchema) -> Self {
        match field {
            FieldSchema::Column(column) => TaggedField::Column(column),
            FieldSchema::Relation(relation) => match relation.kind {
                RelationType::ManyToOne => TaggedField::ManyToOne(relation),
                RelationType::OneToOne => TaggedField::OneToOne(relation),
                RelationType::OneToMany => TaggedField::OneToMany(relation),
                RelationType::ManyToMany => TaggedField::ManyToMany(relation),
            },
        }
    }
}

impl FieldSchema {
    pub fn as_column(&self) -> Option<&ColumnSchema> {
        match self {
            FieldSchema::Column(column) => Some(column),
            FieldSchema::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationSchema> {
        match self {
            FieldSchema::Relation(relation) => Some(relation),
            FieldSchema::Column(_) => None,
        }
    }

    /// Name used in error messages ("Column", "ManyToOne", ...)
    pub fn type_name(&self) -> String {
        match self {
            FieldSchema::Column(_) => "Column".to_string(),
            FieldSchema::Relation(relation) => relation.kind.to_string(),
        }
    }
}

impl From<ColumnSchema> for FieldSchema {
    fn from(column: ColumnSchema) -> Self {
        FieldSchema::Column(column)
    }
}

impl From<RelationSchema> for FieldSchema {
    fn from(relation: RelationSchema) -> Self {
        FieldSchema::Relation(relation)
    }
}

/// Scope an action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionScope {
    Single,
    Bulk,
    Global,
}

/// Action definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSchema {
    pub scope: ActionScope,
    #[serde(default)]
    pub generate_file: bool,
    #[serde(default)]
    pub static_form: bool,
}

/// Full description of one collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    #[serde(default)]
    pub actions: BTreeMap<String, ActionSchema>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSchema>,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub segments: Vec<String>,
}

impl CollectionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, field: impl Into<FieldSchema>) -> Self {
        self.fields.insert(name.into(), field.into());
        self
    }

    pub fn with_action(mut self, name: impl Into<String>, action: ActionSchema) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    /// Primary key columns, in field-name order.
    ///
    /// That order is what [`crate::record::CompositeId`] values follow.
    pub fn primary_keys(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, field)| matches!(field, FieldSchema::Column(c) if c.is_primary_key))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.fields.get(name).and_then(FieldSchema::as_column)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.fields.get(name).and_then(FieldSchema::as_relation)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &ColumnSchema)> {
        self.fields.iter().filter_map(|(name, field)| field.as_column().map(|c| (name, c)))
    }

    pub fn relations(&self) -> impl Iterator<Item = (&String, &RelationSchema)> {
        self.fields.iter().filter_map(|(name, field)| field.as_relation().map(|r| (name, r)))
    }
}

/// Data source level schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSchema {
    #[serde(default)]
    pub charts: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_schema_uses_a_type_tag_on_the_wire() {
        let schema = CollectionSchema::new()
            .with_field(
                "id",
                ColumnSchema::new(ColumnType::Number)
                    .primary_key()
                    .with_operators([Operator::Equal, Operator::In]),
            )
            .with_field("author", RelationSchema::many_to_one("persons", "author_id", "id"));

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["fields"]["id"]["type"], "Column");
        assert_eq!(json["fields"]["id"]["columnType"], "Number");
        assert_eq!(json["fields"]["id"]["filterOperators"], json!(["equal", "in"]));
        assert_eq!(json["fields"]["author"]["type"], "ManyToOne");

        let back: CollectionSchema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.relation("author").map(|r| r.kind), Some(RelationType::ManyToOne));
    }

    #[test]
    fn filter_operators_deserialize_from_an_array_into_a_set() {
        let column: FieldSchema = serde_json::from_value(json!({
            "type": "Column",
            "columnType": "String",
            "filterOperators": ["equal", "contains", "equal"]
        }))
        .unwrap();

        let column = column.as_column().cloned().unwrap();
        assert_eq!(column.filter_operators.len(), 2);
        assert!(column.filter_operators.contains(&Operator::Contains));
        assert!(column.is_sortable);
    }

    #[test]
    fn primary_keys_follow_field_order() {
        let schema = CollectionSchema::new()
            .with_field("b", ColumnSchema::new(ColumnType::Number).primary_key())
            .with_field("a", ColumnSchema::new(ColumnType::String).primary_key())
            .with_field("c", ColumnSchema::new(ColumnType::String));

        assert_eq!(schema.primary_keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
