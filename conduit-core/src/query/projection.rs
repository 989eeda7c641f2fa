//! Projections: which fields a read returns

use crate::collection::Collection;
use crate::error::{Result, ValidationError};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, FieldSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered, duplicate-free list of field paths (`title`, `author:name`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Projection(Vec<String>);

impl From<Vec<String>> for Projection {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl From<Projection> for Vec<String> {
    fn from(projection: Projection) -> Self {
        projection.0
    }
}

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self(Vec::new());
        for field in fields {
            projection.push(field.into());
        }
        projection
    }

    /// Every column of a collection
    pub fn columns_of(schema: &CollectionSchema) -> Self {
        Self::new(schema.columns().map(|(name, _)| name.clone()))
    }

    /// Primary key columns of a collection
    pub fn primary_keys_of(schema: &CollectionSchema) -> Self {
        Self::new(schema.primary_keys())
    }

    fn push(&mut self, field: String) {
        if !self.0.contains(&field) {
            self.0.push(field);
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields that are not relation paths
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str).filter(|f| !f.contains(':'))
    }

    /// Relation paths grouped by their first hop
    pub fn relations(&self) -> BTreeMap<String, Projection> {
        let mut relations: BTreeMap<String, Projection> = BTreeMap::new();
        for field in &self.0 {
            if let Some((prefix, rest)) = field.split_once(':') {
                relations.entry(prefix.to_string()).or_default().push(rest.to_string());
            }
        }
        relations
    }

    pub fn union(mut self, other: &Projection) -> Self {
        for field in &other.0 {
            self.push(field.clone());
        }
        self
    }

    pub fn nest(&self, prefix: &str) -> Self {
        Self::new(self.0.iter().map(|f| format!("{}:{}", prefix, f)))
    }

    /// Keep the fields under `prefix`, without the prefix.
    pub fn unnest(&self, prefix: &str) -> Self {
        self.relations().remove(prefix).unwrap_or_default()
    }

    pub fn replace(&self, f: impl Fn(&str) -> String) -> Self {
        Self::new(self.0.iter().map(|field| f(field)))
    }

    /// Add the primary keys of the collection and of every relation the projection goes through.
    pub fn with_pks(&self, collection: &dyn Collection) -> Result<Self> {
        let schema = collection.schema();
        let mut result = self.clone();
        for pk in schema.primary_keys() {
            result.push(pk);
        }

        for (prefix, sub) in self.relations() {
            let relation = match schema.fields.get(&prefix) {
                Some(FieldSchema::Relation(relation)) => relation,
                Some(_) => continue,
                None => {
                    return Err(ValidationError::FieldNotFound {
                        field: prefix,
                        collection: collection.name().to_string(),
                    }
                    .into())
                }
            };
            let foreign = collection.data_source()?.get_collection(&relation.foreign_collection)?;
            result = result.union(&sub.with_pks(foreign.as_ref())?.nest(&prefix));
        }

        Ok(result)
    }

    /// Reduce a record to the projected fields.
    ///
    /// Absent columns are left out. An absent or null relation becomes null.
    pub fn apply(&self, record: &RecordData) -> RecordData {
        let mut result = RecordData::new();
        for column in self.columns() {
            if let Some(value) = record.get(column) {
                result.insert(column.to_string(), value.clone());
            }
        }
        for (prefix, sub) in self.relations() {
            let value = match record.get(&prefix) {
                Some(Value::Object(nested)) => Value::Object(sub.apply(nested)),
                _ => Value::Null,
            };
            result.insert(prefix, value);
        }
        result
    }
}
