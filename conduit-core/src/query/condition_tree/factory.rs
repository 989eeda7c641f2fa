//! Condition tree constructors

use super::{Aggregator, ConditionTree, ConditionTreeLeaf};
use crate::error::{ConfigurationError, Result, ValidationError};
use crate::query::Operator;
use crate::record::{self, CompositeId, RecordData};
use crate::schema::CollectionSchema;
use serde_json::Value;

/// Builds condition trees
pub struct ConditionTreeFactory;

impl ConditionTreeFactory {
    /// Or of the given trees, flattening nested Or branches.
    ///
    /// `None` when no tree is given.
    pub fn union(trees: Vec<ConditionTree>) -> Option<ConditionTree> {
        Self::group(Aggregator::Or, trees)
    }

    /// And of the given trees, flattening nested And branches.
    ///
    /// `None` stands for "no condition" both in input and in output.
    pub fn intersect(trees: Vec<Option<ConditionTree>>) -> Option<ConditionTree> {
        Self::group(Aggregator::And, trees.into_iter().flatten().collect())
    }

    fn group(aggregator: Aggregator, trees: Vec<ConditionTree>) -> Option<ConditionTree> {
        let mut conditions = Vec::with_capacity(trees.len());
        for tree in trees {
            match tree {
                ConditionTree::Branch(branch) if branch.aggregator == aggregator => {
                    conditions.extend(branch.conditions)
                }
                other => conditions.push(other),
            }
        }

        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(ConditionTree::branch(aggregator, conditions)),
        }
    }

    /// Tree matching exactly the records with the given ids.
    ///
    /// - single primary key, one id: `pk equal id`
    /// - single primary key, any other count: `pk in [ids]`
    /// - composite primary key: Or of And(`pk_i equal id_i`)
    /// - composite primary key, no id: `first_pk in []`
    pub fn match_ids(schema: &CollectionSchema, ids: &[CompositeId]) -> Result<ConditionTree> {
        let primary_keys = schema.primary_keys();
        let Some(first) = primary_keys.first() else {
            return Err(ConfigurationError::InvalidConditionTree(
                "Collection must have at least one primary key".to_string(),
            )
            .into());
        };

        for pk in &primary_keys {
            let supports_equal = schema
                .column(pk)
                .is_some_and(|column| column.filter_operators.contains(&Operator::Equal));
            if !supports_equal {
                return Err(ConfigurationError::InvalidConditionTree(format!(
                    "Field '{}' must support the operators: ['equal']",
                    pk
                ))
                .into());
            }
        }

        for id in ids {
            if id.len() != primary_keys.len() {
                return Err(ValidationError::InvalidCompositeId {
                    given: Value::Array(id.clone()).to_string(),
                    expected: primary_keys.join(","),
                }
                .into());
            }
        }

        if primary_keys.len() == 1 {
            let mut values: Vec<Value> = ids.iter().map(|id| id[0].clone()).collect();
            return Ok(if values.len() == 1 {
                ConditionTree::leaf(first.clone(), Operator::Equal, values.remove(0))
            } else {
                ConditionTree::leaf(first.clone(), Operator::In, Value::Array(values))
            });
        }

        let per_record = ids
            .iter()
            .map(|id| {
                let equalities = primary_keys
                    .iter()
                    .zip(id)
                    .map(|(pk, value)| Some(ConditionTree::leaf(pk.clone(), Operator::Equal, value.clone())))
                    .collect();
                Self::intersect(equalities)
            })
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();

        Ok(Self::union(per_record).unwrap_or_else(|| {
            ConditionTree::leaf(first.clone(), Operator::In, Value::Array(Vec::new()))
        }))
    }

    /// Tree matching exactly the given records, by primary key
    pub fn match_records(schema: &CollectionSchema, records: &[RecordData]) -> Result<ConditionTree> {
        let ids = records
            .iter()
            .map(|record| record::primary_key(schema, record))
            .collect::<Result<Vec<_>>>()?;
        Self::match_ids(schema, &ids)
    }

    /// Rebuild a tree from its JSON form.
    ///
    /// `null` yields `None`. A branch with a null aggregator or a null
    /// condition is a configuration error.
    pub fn from_plain_object(json: &Value) -> Result<Option<ConditionTree>> {
        let object = match json {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(ConfigurationError::InvalidConditionTree(other.to_string()).into())
            }
        };

        if object.contains_key("aggregator") {
            let aggregator = match object.get("aggregator") {
                None | Some(Value::Null) => return Err(ConfigurationError::NullAggregator.into()),
                Some(value) => serde_json::from_value::<Aggregator>(value.clone()).map_err(|e| {
                    ConfigurationError::InvalidConditionTree(format!("invalid aggregator: {}", e))
                })?,
            };
            let items = match object.get("conditions") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ConfigurationError::InvalidConditionTree(
                        "a branch needs a 'conditions' array".to_string(),
                    )
                    .into())
                }
            };
            let conditions = items
                .iter()
                .map(|item| -> Result<ConditionTree> {
                    Ok(Self::from_plain_object(item)?.ok_or(ConfigurationError::NullCondition)?)
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(ConditionTree::branch(aggregator, conditions)));
        }

        if let Some(inner) = object.get("condition") {
            let inner = Self::from_plain_object(inner)?.ok_or(ConfigurationError::NullCondition)?;
            return Ok(Some(ConditionTree::not(inner)));
        }

        if object.contains_key("field") && object.contains_key("operator") {
            let leaf: ConditionTreeLeaf = serde_json::from_value(json.clone())
                .map_err(|e| ConfigurationError::InvalidConditionTree(e.to_string()))?;
            return Ok(Some(ConditionTree::Leaf(leaf)));
        }

        Err(ConfigurationError::InvalidConditionTree(json.to_string()).into())
    }
}
