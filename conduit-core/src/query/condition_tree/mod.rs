//! Condition trees
//!
//! Backend-independent boolean filter expressions. A tree is a leaf
//! (`field operator value`), an `And`/`Or` branch over sub-trees, or the
//! negation of a sub-tree. Field paths may traverse to-one relations
//! (`author:name`).
//!
//! Trees are immutable values: every transform consumes the tree and returns
//! a new one.

pub mod factory;

pub use factory::ConditionTreeFactory;

use crate::error::{ConfigurationError, Error, Result, ValidationError};
use crate::patterns::PatternMatcher;
use crate::query::{Operator, Projection};
use crate::record::{self, RecordData};
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Branch aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregator {
    And,
    Or,
}

/// `field operator value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTreeLeaf {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

/// `aggregator(conditions...)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionTreeBranch {
    pub aggregator: Aggregator,
    pub conditions: Vec<ConditionTree>,
}

/// `not(condition)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionTreeNot {
    pub condition: Box<ConditionTree>,
}

/// Filter expression.
///
/// Serialized without a tag: the shape of the object tells the variants apart.
/// Deserialization goes through [`ConditionTreeFactory::from_plain_object`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionTree {
    Branch(ConditionTreeBranch),
    Not(ConditionTreeNot),
    Leaf(ConditionTreeLeaf),
}

impl<'de> Deserialize<'de> for ConditionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = Value::deserialize(deserializer)?;
        ConditionTreeFactory::from_plain_object(&json)
            .map_err(serde::de::Error::custom)?
            .ok_or_else(|| serde::de::Error::custom(ConfigurationError::NullCondition))
    }
}

impl From<ConditionTreeLeaf> for ConditionTree {
    fn from(leaf: ConditionTreeLeaf) -> Self {
        ConditionTree::Leaf(leaf)
    }
}

impl ConditionTreeLeaf {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self { field: field.into(), operator, value }
    }

    pub fn projection(&self) -> Projection {
        Projection::new([self.field.clone()])
    }

    pub fn nest(self, prefix: &str) -> Self {
        Self { field: format!("{}:{}", prefix, self.field), ..self }
    }

    /// Drop the first hop of the field path
    pub fn unnest(self) -> Result<Self> {
        match self.field.split_once(':') {
            Some((_, rest)) => Ok(Self { field: rest.to_string(), ..self }),
            None => Err(ValidationError::NotNested { field: self.field }.into()),
        }
    }

    /// Leaf selecting the records this one rejects.
    pub fn inverse(self) -> ConditionTree {
        match self.operator.inverse() {
            Some(operator) => ConditionTree::Leaf(Self { operator, ..self }),
            None => ConditionTree::not(ConditionTree::Leaf(self)),
        }
    }

    /// Evaluate the leaf against a record whose relation paths are hydrated.
    pub fn apply(&self, record: &RecordData) -> bool {
        let actual = record::field_value(record, &self.field).unwrap_or(&Value::Null);
        self.matches(actual)
    }

    /// Evaluate the operator against a single value
    pub fn matches(&self, actual: &Value) -> bool {
        let expected = &self.value;
        match self.operator {
            Operator::Present => !is_blank(actual),
            Operator::Blank => is_blank(actual),
            Operator::Missing => actual.is_null(),
            Operator::Equal => record::values_equal(actual, expected),
            Operator::NotEqual => !record::values_equal(actual, expected),
            Operator::LessThan => record::compare(actual, expected) == Some(Ordering::Less),
            Operator::LessThanOrEqual => {
                matches!(record::compare(actual, expected), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::GreaterThan => record::compare(actual, expected) == Some(Ordering::Greater),
            Operator::GreaterThanOrEqual => {
                matches!(record::compare(actual, expected), Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::In => contains_value(expected, actual),
            Operator::NotIn => !contains_value(expected, actual),
            Operator::Like => like(actual, expected, true),
            Operator::ILike => like(actual, expected, false),
            Operator::StartsWith => {
                text_pair(actual, expected).is_some_and(|(a, e)| a.starts_with(e))
            }
            Operator::EndsWith => text_pair(actual, expected).is_some_and(|(a, e)| a.ends_with(e)),
            Operator::Contains => text_pair(actual, expected).is_some_and(|(a, e)| a.contains(e)),
            Operator::NotContains => {
                !text_pair(actual, expected).is_some_and(|(a, e)| a.contains(e))
            }
            Operator::LongerThan => length_cmp(actual, expected) == Some(Ordering::Greater),
            Operator::ShorterThan => length_cmp(actual, expected) == Some(Ordering::Less),
            Operator::IncludesAll => match (actual, expected) {
                (Value::Array(items), Value::Array(required)) => {
                    required.iter().all(|r| items.iter().any(|i| record::values_equal(i, r)))
                }
                _ => false,
            },
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn contains_value(list: &Value, actual: &Value) -> bool {
    match list {
        Value::Array(items) => items.iter().any(|item| record::values_equal(item, actual)),
        _ => false,
    }
}

fn text_pair<'a>(actual: &'a Value, expected: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((actual.as_str()?, expected.as_str()?))
}

fn like(actual: &Value, pattern: &Value, case_sensitive: bool) -> bool {
    text_pair(actual, pattern)
        .is_some_and(|(value, pattern)| PatternMatcher::like(pattern, value, case_sensitive))
}

fn length_cmp(actual: &Value, expected: &Value) -> Option<Ordering> {
    let length = match actual {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        _ => return None,
    };
    (length as f64).partial_cmp(&expected.as_f64()?)
}

impl ConditionTree {
    pub fn leaf(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        ConditionTree::Leaf(ConditionTreeLeaf::new(field, operator, value))
    }

    pub fn branch(aggregator: Aggregator, conditions: Vec<ConditionTree>) -> Self {
        ConditionTree::Branch(ConditionTreeBranch { aggregator, conditions })
    }

    pub fn not(condition: ConditionTree) -> Self {
        ConditionTree::Not(ConditionTreeNot { condition: Box::new(condition) })
    }

    /// Evaluate the tree against a record whose relation paths are hydrated.
    pub fn apply(&self, record: &RecordData) -> bool {
        match self {
            ConditionTree::Leaf(leaf) => leaf.apply(record),
            ConditionTree::Not(not) => !not.condition.apply(record),
            ConditionTree::Branch(branch) => match branch.aggregator {
                Aggregator::And => branch.conditions.iter().all(|c| c.apply(record)),
                Aggregator::Or => branch.conditions.iter().any(|c| c.apply(record)),
            },
        }
    }

    /// Keep the records matching the tree
    pub fn filter_records(&self, records: Vec<RecordData>) -> Vec<RecordData> {
        records.into_iter().filter(|record| self.apply(record)).collect()
    }

    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a ConditionTreeLeaf)) {
        match self {
            ConditionTree::Leaf(leaf) => f(leaf),
            ConditionTree::Not(not) => not.condition.for_each_leaf(f),
            ConditionTree::Branch(branch) => {
                for condition in &branch.conditions {
                    condition.for_each_leaf(f);
                }
            }
        }
    }

    pub fn every_leaf(&self, f: impl Fn(&ConditionTreeLeaf) -> bool) -> bool {
        let mut all = true;
        self.for_each_leaf(&mut |leaf| all = all && f(leaf));
        all
    }

    pub fn some_leaf(&self, f: impl Fn(&ConditionTreeLeaf) -> bool) -> bool {
        let mut any = false;
        self.for_each_leaf(&mut |leaf| any = any || f(leaf));
        any
    }

    /// Fields the tree reads
    pub fn projection(&self) -> Projection {
        let mut fields = Vec::new();
        self.for_each_leaf(&mut |leaf| fields.push(leaf.field.clone()));
        Projection::new(fields)
    }

    /// Rebuild the tree, replacing each leaf by the tree `f` returns for it.
    pub fn replace_leafs(self, f: &mut impl FnMut(ConditionTreeLeaf) -> ConditionTree) -> Self {
        match self {
            ConditionTree::Leaf(leaf) => f(leaf),
            ConditionTree::Not(not) => ConditionTree::not(not.condition.replace_leafs(f)),
            ConditionTree::Branch(branch) => ConditionTree::branch(
                branch.aggregator,
                branch.conditions.into_iter().map(|c| c.replace_leafs(f)).collect(),
            ),
        }
    }

    /// Async, fallible version of [`ConditionTree::replace_leafs`].
    ///
    /// Sibling leaves of a branch are replaced concurrently.
    pub fn replace_leafs_async<'a, F>(self, handler: &'a F) -> BoxFuture<'a, Result<ConditionTree>>
    where
        F: Fn(ConditionTreeLeaf) -> BoxFuture<'a, Result<ConditionTree>> + Sync,
    {
        async move {
            match self {
                ConditionTree::Leaf(leaf) => handler(leaf).await,
                ConditionTree::Not(not) => {
                    Ok(ConditionTree::not(not.condition.replace_leafs_async(handler).await?))
                }
                ConditionTree::Branch(branch) => {
                    let conditions = future::try_join_all(
                        branch.conditions.into_iter().map(|c| c.replace_leafs_async(handler)),
                    )
                    .await?;
                    Ok(ConditionTree::branch(branch.aggregator, conditions))
                }
            }
        }
        .boxed()
    }

    /// Rename every leaf field
    pub fn replace_fields(self, f: impl Fn(&str) -> String) -> Self {
        self.replace_leafs(&mut |leaf| {
            let field = f(&leaf.field);
            ConditionTree::Leaf(ConditionTreeLeaf { field, ..leaf })
        })
    }

    /// Prefix every leaf field with `prefix:`
    pub fn nest(self, prefix: &str) -> Self {
        self.replace_fields(|field| format!("{}:{}", prefix, field))
    }

    /// Remove the shared first hop of every leaf field.
    ///
    /// Fails when a leaf is not a relation path or when leaves go through different relations.
    pub fn unnest(self) -> Result<Self> {
        let mut prefix: Option<String> = None;
        let mut error: Option<Error> = None;
        self.for_each_leaf(&mut |leaf| {
            if error.is_some() {
                return;
            }
            let known = prefix.clone();
            match (leaf.field.split_once(':'), known) {
                (Some((first, _)), None) => prefix = Some(first.to_string()),
                (Some((first, _)), Some(expected)) if first == expected => {}
                _ => error = Some(ValidationError::NotNested { field: leaf.field.clone() }.into()),
            }
        });
        if let Some(error) = error {
            return Err(error);
        }

        Ok(self.replace_fields(|field| match field.split_once(':') {
            Some((_, rest)) => rest.to_string(),
            None => field.to_string(),
        }))
    }

    /// Tree selecting the records this one rejects
    pub fn inverse(self) -> Self {
        match self {
            ConditionTree::Leaf(leaf) => leaf.inverse(),
            ConditionTree::Not(not) => *not.condition,
            ConditionTree::Branch(branch) => ConditionTree::branch(
                match branch.aggregator {
                    Aggregator::And => Aggregator::Or,
                    Aggregator::Or => Aggregator::And,
                },
                branch.conditions.into_iter().map(ConditionTree::inverse).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RecordData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_apply_and_branch() {
        let tree = ConditionTree::branch(
            Aggregator::And,
            vec![
                ConditionTree::leaf("title", Operator::Equal, json!("Foundation")),
                ConditionTree::leaf("year", Operator::GreaterThan, json!(1950)),
            ],
        );

        assert!(tree.apply(&record(json!({"title": "Foundation", "year": 1951}))));
        assert!(!tree.apply(&record(json!({"title": "Foundation", "year": 1942}))));
        assert!(!tree.apply(&record(json!({"title": "Dune", "year": 1965}))));
    }

    #[test]
    fn test_apply_not_and_or() {
        let tree = ConditionTree::not(ConditionTree::branch(
            Aggregator::Or,
            vec![
                ConditionTree::leaf("id", Operator::In, json!([1, 2])),
                ConditionTree::leaf("title", Operator::Missing, Value::Null),
            ],
        ));

        assert!(!tree.apply(&record(json!({"id": 1, "title": "Dune"}))));
        assert!(!tree.apply(&record(json!({"id": 3}))));
        assert!(tree.apply(&record(json!({"id": 3, "title": "Dune"}))));
    }

    #[test]
    fn test_text_operators() {
        let value = json!("Foundation and Empire");
        let leaf = |operator, v: Value| ConditionTreeLeaf::new("title", operator, v);

        assert!(leaf(Operator::Contains, json!("and")).matches(&value));
        assert!(leaf(Operator::NotContains, json!("Dune")).matches(&value));
        assert!(leaf(Operator::StartsWith, json!("Found")).matches(&value));
        assert!(leaf(Operator::EndsWith, json!("Empire")).matches(&value));
        assert!(leaf(Operator::Like, json!("Found%Empire")).matches(&value));
        assert!(leaf(Operator::ILike, json!("found%")).matches(&value));
        assert!(!leaf(Operator::Like, json!("found%")).matches(&value));
        assert!(leaf(Operator::LongerThan, json!(5)).matches(&value));
        assert!(leaf(Operator::ShorterThan, json!(100)).matches(&value));
        assert!(!leaf(Operator::Contains, json!("and")).matches(&Value::Null));
    }

    #[test]
    fn test_presence_operators() {
        let present = ConditionTreeLeaf::new("title", Operator::Present, Value::Null);
        let blank = ConditionTreeLeaf::new("title", Operator::Blank, Value::Null);

        assert!(present.matches(&json!("x")));
        assert!(!present.matches(&json!("")));
        assert!(blank.matches(&json!("")));
        assert!(blank.matches(&Value::Null));
    }

    #[test]
    fn test_includes_all() {
        let leaf = ConditionTreeLeaf::new("tags", Operator::IncludesAll, json!(["a", "b"]));
        assert!(leaf.matches(&json!(["b", "c", "a"])));
        assert!(!leaf.matches(&json!(["a"])));
    }

    #[test]
    fn test_nest_unnest() {
        let tree = ConditionTree::branch(
            Aggregator::And,
            vec![
                ConditionTree::leaf("name", Operator::Equal, json!("Asimov")),
                ConditionTree::leaf("address:city", Operator::Equal, json!("NYC")),
            ],
        );

        let nested = tree.clone().nest("author");
        assert_eq!(nested.projection().fields(), &["author:name", "author:address:city"]);
        assert_eq!(nested.unnest().unwrap(), tree);
    }

    #[test]
    fn test_unnest_rejects_mixed_prefixes() {
        let tree = ConditionTree::branch(
            Aggregator::Or,
            vec![
                ConditionTree::leaf("author:name", Operator::Present, Value::Null),
                ConditionTree::leaf("publisher:name", Operator::Present, Value::Null),
            ],
        );
        assert!(tree.unnest().is_err());
        assert!(ConditionTree::leaf("title", Operator::Present, Value::Null).unnest().is_err());
    }

    #[test]
    fn test_inverse() {
        let tree = ConditionTree::branch(
            Aggregator::And,
            vec![
                ConditionTree::leaf("id", Operator::Equal, json!(1)),
                ConditionTree::leaf("title", Operator::Like, json!("D%")),
            ],
        );
        let inverse = tree.clone().inverse();

        for candidate in [json!({"id": 1, "title": "Dune"}), json!({"id": 2, "title": "Dune"})] {
            let candidate = record(candidate);
            assert_eq!(inverse.apply(&candidate), !tree.apply(&candidate));
        }
    }

    #[test]
    fn test_serialization_shapes() {
        let tree = ConditionTree::not(ConditionTree::branch(
            Aggregator::Or,
            vec![
                ConditionTree::leaf("id", Operator::Equal, json!(1)),
                ConditionTree::leaf("id", Operator::Equal, json!(2)),
            ],
        ));

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            json!({"condition": {"aggregator": "Or", "conditions": [
                {"field": "id", "operator": "equal", "value": 1},
                {"field": "id", "operator": "equal", "value": 2}
            ]}})
        );
        let back: ConditionTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }

    #[tokio::test]
    async fn test_replace_leafs_async() {
        let tree = ConditionTree::branch(
            Aggregator::Or,
            vec![
                ConditionTree::leaf("a", Operator::Equal, json!(1)),
                ConditionTree::not(ConditionTree::leaf("b", Operator::Equal, json!(2))),
            ],
        );

        let handler = |leaf: ConditionTreeLeaf| {
            async move {
                Ok::<_, Error>(ConditionTree::Leaf(ConditionTreeLeaf { value: json!("x"), ..leaf }))
            }
            .boxed()
        };
        let replaced = tree.replace_leafs_async(&handler).await.unwrap();

        assert!(replaced.every_leaf(|leaf| leaf.value == json!("x")));
        assert!(replaced.some_leaf(|leaf| leaf.field == "b"));
    }
}
