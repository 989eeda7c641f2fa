//! Aggregations
//!
//! `operation(field)` computed over groups of records. Date groups can be
//! truncated to a year, month, ISO week or day.

use crate::query::Projection;
use crate::record::{self, RecordData};
use chrono::{DateTime, Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationOperation {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateOperation {
    Year,
    Month,
    Week,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationGroup {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<DateOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub operation: AggregationOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AggregationGroup>,
}

/// One row of an aggregation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub value: Value,
    #[serde(default)]
    pub group: RecordData,
}

impl Aggregation {
    pub fn count() -> Self {
        Self { operation: AggregationOperation::Count, field: None, groups: Vec::new() }
    }

    pub fn new(operation: AggregationOperation, field: impl Into<String>) -> Self {
        Self { operation, field: Some(field.into()), groups: Vec::new() }
    }

    pub fn group_by(mut self, field: impl Into<String>, operation: Option<DateOperation>) -> Self {
        self.groups.push(AggregationGroup { field: field.into(), operation });
        self
    }

    /// Fields read by the aggregation
    pub fn projection(&self) -> Projection {
        Projection::new(self.field.iter().cloned().chain(self.groups.iter().map(|g| g.field.clone())))
    }

    pub fn replace_fields(self, f: impl Fn(&str) -> String) -> Self {
        Self {
            operation: self.operation,
            field: self.field.as_deref().map(&f),
            groups: self
                .groups
                .into_iter()
                .map(|group| AggregationGroup { field: f(&group.field), operation: group.operation })
                .collect(),
        }
    }

    pub fn nest(self, prefix: &str) -> Self {
        self.replace_fields(|field| format!("{}:{}", prefix, field))
    }

    /// Compute the aggregation over hydrated records.
    ///
    /// Rows come out sorted by value, largest first, then cut to `limit`.
    pub fn apply(&self, records: &[RecordData], limit: Option<usize>) -> Vec<AggregateResult> {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, (RecordData, Vec<&RecordData>)> = HashMap::new();

        for record in records {
            let mut group = RecordData::new();
            for g in &self.groups {
                let value = record::field_value(record, &g.field).cloned().unwrap_or(Value::Null);
                let value = match g.operation {
                    Some(operation) => truncate_date(&value, operation),
                    None => value,
                };
                group.insert(g.field.clone(), value);
            }

            let key = Value::Object(group.clone()).to_string();
            buckets
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    (group, Vec::new())
                })
                .1
                .push(record);
        }

        let mut rows: Vec<AggregateResult> = order
            .into_iter()
            .filter_map(|key| buckets.remove(&key))
            .map(|(group, members)| AggregateResult { value: self.compute(&members), group })
            .collect();

        rows.sort_by(|a, b| record::sort_order(&b.value, &a.value));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }

    fn compute(&self, records: &[&RecordData]) -> Value {
        let values: Vec<&Value> = match &self.field {
            Some(field) => records
                .iter()
                .filter_map(|r| record::field_value(r, field))
                .filter(|v| !v.is_null())
                .collect(),
            None => Vec::new(),
        };

        match self.operation {
            AggregationOperation::Count => match self.field {
                Some(_) => Value::from(values.len()),
                None => Value::from(records.len()),
            },
            AggregationOperation::Sum => {
                number_value(values.iter().filter_map(|v| v.as_f64()).sum())
            }
            AggregationOperation::Avg => {
                let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    number_value(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            AggregationOperation::Max => extremum(&values, Ordering::Greater),
            AggregationOperation::Min => extremum(&values, Ordering::Less),
        }
    }
}

fn extremum(values: &[&Value], wanted: Ordering) -> Value {
    values
        .iter()
        .copied()
        .fold(None::<&Value>, |best, value| match best {
            Some(current) if record::sort_order(value, current) != wanted => Some(current),
            _ => Some(value),
        })
        .cloned()
        .unwrap_or(Value::Null)
}

/// Integral floats are emitted as integers
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn truncate_date(value: &Value, operation: DateOperation) -> Value {
    let Some(text) = value.as_str() else {
        return value.clone();
    };
    let date = DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"));
    let Ok(date) = date else {
        return value.clone();
    };

    let truncated = match operation {
        DateOperation::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        DateOperation::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
        DateOperation::Week => {
            Some(date - Duration::days(i64::from(date.weekday().num_days_from_monday())))
        }
        DateOperation::Day => Some(date),
    };
    truncated
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(|| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<RecordData> {
        [
            json!({"id": 1, "genre": "sf", "pages": 400, "published": "1965-08-01"}),
            json!({"id": 2, "genre": "sf", "pages": 250, "published": "1951-06-01"}),
            json!({"id": 3, "genre": "fantasy", "pages": 300, "published": "1954-07-29T00:00:00Z"}),
            json!({"id": 4, "genre": "sf", "pages": null, "published": "1965-12-24"}),
        ]
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn test_count_all() {
        let rows = Aggregation::count().apply(&records(), None);
        assert_eq!(rows, vec![AggregateResult { value: json!(4), group: RecordData::new() }]);
    }

    #[test]
    fn test_sum_grouped_sorted_by_value() {
        let rows = Aggregation::new(AggregationOperation::Sum, "pages")
            .group_by("genre", None)
            .apply(&records(), None);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, json!(650));
        assert_eq!(rows[0].group["genre"], json!("sf"));
        assert_eq!(rows[1].value, json!(300));
    }

    #[test]
    fn test_avg_min_max_ignore_nulls() {
        let data = records();
        assert_eq!(
            Aggregation::new(AggregationOperation::Avg, "pages").apply(&data, None)[0].value,
            json!(316.6666666666667)
        );
        assert_eq!(Aggregation::new(AggregationOperation::Max, "pages").apply(&data, None)[0].value, json!(400));
        assert_eq!(Aggregation::new(AggregationOperation::Min, "pages").apply(&data, None)[0].value, json!(250));
        assert_eq!(Aggregation::new(AggregationOperation::Count, "pages").apply(&data, None)[0].value, json!(3));
    }

    #[test]
    fn test_group_by_year_with_limit() {
        let rows = Aggregation::count()
            .group_by("published", Some(DateOperation::Year))
            .apply(&records(), Some(1));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, json!(2));
        assert_eq!(rows[0].group["published"], json!("1965-01-01"));
    }

    #[test]
    fn test_week_truncates_to_monday() {
        // 1965-08-01 was a Sunday
        assert_eq!(truncate_date(&json!("1965-08-01"), DateOperation::Week), json!("1965-07-26"));
        assert_eq!(truncate_date(&json!("1954-07-29T00:00:00Z"), DateOperation::Month), json!("1954-07-01"));
        assert_eq!(truncate_date(&json!(12), DateOperation::Day), json!(12));
    }
}
