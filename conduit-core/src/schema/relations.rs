//! Relation fields between collections
//!
//! A relation field does not hold a value of its own: it describes how records
//! of one collection point at records of another one, so that field paths such
//! as `author:name` can be resolved through it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported relation kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// The foreign key lives on the origin record and is unique on both sides
    OneToOne,
    /// The foreign key lives on the origin record
    #[default]
    ManyToOne,
    /// Reverse side of a ManyToOne
    OneToMany,
    /// Both sides are linked through a third collection
    ManyToMany,
}

impl RelationType {
    /// Whether a record points at no more than one foreign record.
    ///
    /// Only to-one relations may appear as a prefix in a field path.
    pub fn is_to_one(self) -> bool {
        matches!(self, RelationType::ManyToOne | RelationType::OneToOne)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationType::OneToOne => "OneToOne",
            RelationType::ManyToOne => "ManyToOne",
            RelationType::OneToMany => "OneToMany",
            RelationType::ManyToMany => "ManyToMany",
        };
        f.write_str(name)
    }
}

/// Relation field definition.
///
/// Which keys are set depends on the kind:
///
/// | kind       | keys on this collection | keys on the foreign collection | keys on `through_collection` |
/// |------------|-------------------------|--------------------------------|------------------------------|
/// | ManyToOne  | `foreign_key`           | `foreign_key_target`           |                              |
/// | OneToOne   | `origin_key_target`     | `origin_key`                   |                              |
/// | OneToMany  | `origin_key_target`     | `origin_key`                   |                              |
/// | ManyToMany | `origin_key_target`     | `foreign_key_target`           | `origin_key`, `foreign_key`  |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSchema {
    /// Carried by the `type` tag of the enclosing field on the wire
    #[serde(skip)]
    pub kind: RelationType,
    pub foreign_collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_key_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_collection: Option<String>,
}

impl RelationSchema {
    /// ManyToOne relation: `foreign_key` on this collection points at
    /// `foreign_key_target` on `foreign_collection`.
    pub fn many_to_one(
        foreign_collection: impl Into<String>,
        foreign_key: impl Into<String>,
        foreign_key_target: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationType::ManyToOne,
            foreign_collection: foreign_collection.into(),
            foreign_key: Some(foreign_key.into()),
            foreign_key_target: Some(foreign_key_target.into()),
            ..Self::default()
        }
    }

    /// OneToOne relation: `origin_key` on `foreign_collection` points at
    /// `origin_key_target` on this collection.
    pub fn one_to_one(
        foreign_collection: impl Into<String>,
        origin_key: impl Into<String>,
        origin_key_target: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationType::OneToOne,
            foreign_collection: foreign_collection.into(),
            origin_key: Some(origin_key.into()),
            origin_key_target: Some(origin_key_target.into()),
            ..Self::default()
        }
    }

    /// OneToMany relation, the reverse side of a ManyToOne.
    pub fn one_to_many(
        foreign_collection: impl Into<String>,
        origin_key: impl Into<String>,
        origin_key_target: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationType::OneToMany,
            ..Self::one_to_one(foreign_collection, origin_key, origin_key_target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_to_one_relations_can_prefix_paths() {
        assert!(RelationType::ManyToOne.is_to_one());
        assert!(RelationType::OneToOne.is_to_one());
        assert!(!RelationType::OneToMany.is_to_one());
        assert!(!RelationType::ManyToMany.is_to_one());
    }

    #[test]
    fn kind_is_not_serialized_by_the_relation_itself() {
        let relation = RelationSchema::many_to_one("persons", "author_id", "id");
        let json = serde_json::to_value(&relation).unwrap();

        assert_eq!(json["foreignCollection"], "persons");
        assert_eq!(json["foreignKey"], "author_id");
        assert!(json.get("kind").is_none());
        assert!(json.get("originKey").is_none());
    }
}
