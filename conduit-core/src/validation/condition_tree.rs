//! Condition tree validation against a collection schema

use super::field::FieldValidator;
use super::rules;
use super::type_getter::{TypeGetter, ValueType};
use crate::collection::Collection;
use crate::error::{Result, ValidationError};
use crate::query::{ConditionTree, ConditionTreeLeaf, Operator};

pub struct ConditionTreeValidator;

impl ConditionTreeValidator {
    pub fn validate(tree: &ConditionTree, collection: &dyn Collection) -> Result<()> {
        match tree {
            ConditionTree::Branch(branch) => {
                if branch.conditions.len() < 2 {
                    return Err(ValidationError::TooFewConditions(branch.conditions.len()).into());
                }
                branch.conditions.iter().try_for_each(|condition| Self::validate(condition, collection))
            }
            ConditionTree::Not(not) => Self::validate(&not.condition, collection),
            ConditionTree::Leaf(leaf) => Self::validate_leaf(leaf, collection),
        }
    }

    fn validate_leaf(leaf: &ConditionTreeLeaf, collection: &dyn Collection) -> Result<()> {
        let column = FieldValidator::validate(collection, &leaf.field)?;

        let allowed_operators = rules::operators_for_column_type(column.column_type);
        if !allowed_operators.contains(&leaf.operator) {
            return Err(ValidationError::OperatorNotAllowedForColumnType {
                operator: leaf.operator,
                column_type: column.column_type,
                allowed: rules::join(allowed_operators),
            }
            .into());
        }

        if !column.filter_operators.contains(&leaf.operator) {
            return Err(ValidationError::UnsupportedOperator {
                field: leaf.field.clone(),
                operator: leaf.operator,
            }
            .into());
        }

        let value_type = TypeGetter::get(&leaf.value, column.column_type);
        let allowed_for_operator = rules::value_types_for_operator(leaf.operator);
        if !allowed_for_operator.contains(&value_type) {
            return Err(ValidationError::ValueNotAllowedForOperator {
                value: leaf.value.to_string(),
                value_type: value_type.to_string(),
                operator: leaf.operator,
                allowed: rules::join(allowed_for_operator),
            }
            .into());
        }

        // Length operators compare a number against a text column
        let length_operator = matches!(leaf.operator, Operator::LongerThan | Operator::ShorterThan);
        if value_type != ValueType::Null && !length_operator {
            if let Some(allowed_for_column) = rules::value_types_for_column_type(column.column_type) {
                if !allowed_for_column.contains(&value_type) {
                    return Err(ValidationError::ValueNotAllowedForColumnType {
                        value: leaf.value.to_string(),
                        value_type: value_type.to_string(),
                        column_type: column.column_type,
                        allowed: rules::join(allowed_for_column),
                    }
                    .into());
                }
            }
        }

        FieldValidator::validate_enum(&column, &leaf.value)
    }
}
