//! Which operators and value types go together

use super::type_getter::ValueType;
use crate::query::Operator;
use crate::schema::ColumnType;

use Operator::*;

const BASE_OPERATORS: &[Operator] = &[Blank, Equal, Missing, NotEqual, Present];

const ARRAY_TYPES: &[ValueType] = &[
    ValueType::ArrayOfBoolean,
    ValueType::ArrayOfNumber,
    ValueType::ArrayOfString,
    ValueType::ArrayOfUuid,
    ValueType::EmptyArray,
];

/// Operators that make sense for a column type
pub fn operators_for_column_type(column_type: ColumnType) -> Vec<Operator> {
    let extra: &[Operator] = match column_type {
        ColumnType::Boolean | ColumnType::Enum | ColumnType::Uuid => &[In, NotIn],
        ColumnType::Date | ColumnType::Dateonly | ColumnType::Timeonly | ColumnType::Number => {
            &[GreaterThan, LessThan, GreaterThanOrEqual, LessThanOrEqual, In, NotIn]
        }
        ColumnType::String => &[
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
        ],
        ColumnType::Json | ColumnType::Point => &[],
    };
    BASE_OPERATORS.iter().chain(extra).copied().collect()
}

/// Value types a filter value may have for an operator
pub fn value_types_for_operator(operator: Operator) -> &'static [ValueType] {
    match operator {
        Present | Blank | Missing => &[ValueType::Null],
        Equal | NotEqual => &[
            ValueType::Boolean,
            ValueType::Date,
            ValueType::Dateonly,
            ValueType::Enum,
            ValueType::Json,
            ValueType::Number,
            ValueType::Point,
            ValueType::String,
            ValueType::Timeonly,
            ValueType::Uuid,
        ],
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            &[ValueType::Date, ValueType::Dateonly, ValueType::Number, ValueType::Timeonly]
        }
        In | NotIn | IncludesAll => ARRAY_TYPES,
        Like | ILike | StartsWith | EndsWith | Contains | NotContains => &[ValueType::String],
        LongerThan | ShorterThan => &[ValueType::Number],
    }
}

/// Value types a filter value may have for a column type.
///
/// `None` means any value is accepted.
pub fn value_types_for_column_type(column_type: ColumnType) -> Option<&'static [ValueType]> {
    let types: &[ValueType] = match column_type {
        ColumnType::Boolean => &[ValueType::Boolean, ValueType::ArrayOfBoolean, ValueType::EmptyArray],
        ColumnType::Date => &[ValueType::Date, ValueType::ArrayOfString, ValueType::EmptyArray],
        ColumnType::Dateonly => &[ValueType::Dateonly, ValueType::ArrayOfString, ValueType::EmptyArray],
        ColumnType::Timeonly => &[ValueType::Timeonly, ValueType::ArrayOfString, ValueType::EmptyArray],
        ColumnType::Enum => &[ValueType::Enum, ValueType::ArrayOfString, ValueType::EmptyArray],
        ColumnType::Number => &[ValueType::Number, ValueType::ArrayOfNumber, ValueType::EmptyArray],
        ColumnType::Point => &[ValueType::Point],
        ColumnType::String => &[ValueType::String, ValueType::ArrayOfString, ValueType::EmptyArray],
        ColumnType::Uuid => &[ValueType::Uuid, ValueType::ArrayOfUuid, ValueType::EmptyArray],
        ColumnType::Json => return None,
    };
    Some(types)
}

/// `[a,b,c]` rendering used in error messages
pub(crate) fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|item| item.to_string()).collect::<Vec<_>>().join(",")
}
