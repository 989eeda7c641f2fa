//! Filter operators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a condition leaf.
///
/// Serialized in snake_case (`not_equal`, `i_like`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Present,
    Blank,
    Missing,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    Like,
    ILike,
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
    LongerThan,
    ShorterThan,
    IncludesAll,
}

impl Operator {
    pub const ALL: [Operator; 20] = [
        Operator::Present,
        Operator::Blank,
        Operator::Missing,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::In,
        Operator::NotIn,
        Operator::Like,
        Operator::ILike,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Contains,
        Operator::NotContains,
        Operator::LongerThan,
        Operator::ShorterThan,
        Operator::IncludesAll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Present => "present",
            Operator::Blank => "blank",
            Operator::Missing => "missing",
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Like => "like",
            Operator::ILike => "i_like",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::LongerThan => "longer_than",
            Operator::ShorterThan => "shorter_than",
            Operator::IncludesAll => "includes_all",
        }
    }

    /// Operator matching exactly the records this one rejects, when there is one.
    pub fn inverse(self) -> Option<Operator> {
        let inverse = match self {
            Operator::Present => Operator::Blank,
            Operator::Blank => Operator::Present,
            Operator::Equal => Operator::NotEqual,
            Operator::NotEqual => Operator::Equal,
            Operator::In => Operator::NotIn,
            Operator::NotIn => Operator::In,
            Operator::Contains => Operator::NotContains,
            Operator::NotContains => Operator::Contains,
            Operator::LessThan => Operator::GreaterThanOrEqual,
            Operator::GreaterThanOrEqual => Operator::LessThan,
            Operator::GreaterThan => Operator::LessThanOrEqual,
            Operator::LessThanOrEqual => Operator::GreaterThan,
            _ => return None,
        };
        Some(inverse)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}
