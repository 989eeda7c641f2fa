//! Sort clauses

use crate::error::{Result, ValidationError};
use crate::query::Projection;
use crate::record::{self, RecordData};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

/// Ordered list of sort clauses, the first one being the most significant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort(pub Vec<SortClause>);

impl Sort {
    pub fn new(clauses: Vec<SortClause>) -> Self {
        Self(clauses)
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self(vec![SortClause { field: field.into(), ascending: true }])
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self(vec![SortClause { field: field.into(), ascending: false }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clauses(&self) -> &[SortClause] {
        &self.0
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.0.iter().map(|clause| clause.field.clone()))
    }

    pub fn replace_fields(self, f: impl Fn(&str) -> String) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|clause| SortClause { field: f(&clause.field), ..clause })
                .collect(),
        )
    }

    pub fn nest(self, prefix: &str) -> Self {
        self.replace_fields(|field| format!("{}:{}", prefix, field))
    }

    /// Remove `prefix:` from every clause
    pub fn unnest(self, prefix: &str) -> Result<Self> {
        let marker = format!("{}:", prefix);
        let clauses = self
            .0
            .into_iter()
            .map(|clause| match clause.field.strip_prefix(&marker) {
                Some(rest) => Ok(SortClause { field: rest.to_string(), ascending: clause.ascending }),
                None => Err(ValidationError::NotNested { field: clause.field.clone() }.into()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(clauses))
    }

    pub fn inverse(self) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|clause| SortClause { ascending: !clause.ascending, ..clause })
                .collect(),
        )
    }

    /// Stable in-place sort of hydrated records
    pub fn apply(&self, records: &mut [RecordData]) {
        if self.0.is_empty() {
            return;
        }
        records.sort_by(|a, b| {
            for clause in &self.0 {
                let left = record::field_value(a, &clause.field).unwrap_or(&serde_json::Value::Null);
                let right = record::field_value(b, &clause.field).unwrap_or(&serde_json::Value::Null);
                let order = record::sort_order(left, right);
                let order = if clause.ascending { order } else { order.reverse() };
                if order.is_ne() {
                    return order;
                }
            }
            std::cmp::Ordering::Equal
        });
    }
}
