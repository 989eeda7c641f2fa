//! Query validation
//!
//! Backends call these before touching any data, so that a malformed query
//! fails with a [`ValidationError`](crate::ValidationError) instead of a
//! backend-specific error.

pub mod condition_tree;
pub mod field;
pub mod rules;
pub mod type_getter;

pub use condition_tree::ConditionTreeValidator;
pub use field::FieldValidator;
pub use type_getter::{TypeGetter, ValueType};

use crate::collection::Collection;
use crate::error::{Result, ValidationError};
use crate::query::{Aggregation, AggregationOperation, ConditionTree, Filter, PaginatedFilter, Projection};
use crate::record::RecordData;
use crate::schema::ColumnType;

pub fn validate_condition_tree(tree: &ConditionTree, collection: &dyn Collection) -> Result<()> {
    ConditionTreeValidator::validate(tree, collection)
}

pub fn validate_filter(filter: &Filter, collection: &dyn Collection) -> Result<()> {
    match &filter.condition_tree {
        Some(tree) => ConditionTreeValidator::validate(tree, collection),
        None => Ok(()),
    }
}

/// Validate conditions and sort clauses
pub fn validate_paginated_filter(filter: &PaginatedFilter, collection: &dyn Collection) -> Result<()> {
    validate_filter(filter, collection)?;
    for clause in filter.sort.clauses() {
        FieldValidator::validate(collection, &clause.field)?;
    }
    Ok(())
}

pub fn validate_projection(projection: &Projection, collection: &dyn Collection) -> Result<()> {
    for field in projection.fields() {
        FieldValidator::validate(collection, field)?;
    }
    Ok(())
}

/// Aggregated and grouped fields must exist; Sum and Avg need a number column
pub fn validate_aggregation(aggregation: &Aggregation, collection: &dyn Collection) -> Result<()> {
    if let Some(field) = &aggregation.field {
        let column = FieldValidator::validate(collection, field)?;
        let numeric = matches!(aggregation.operation, AggregationOperation::Sum | AggregationOperation::Avg);
        if numeric && column.column_type != ColumnType::Number {
            return Err(ValidationError::InvalidAggregation(format!(
                "{:?} requires a Number field, '{}' is {}",
                aggregation.operation, field, column.column_type
            ))
            .into());
        }
    } else if aggregation.operation != AggregationOperation::Count {
        return Err(ValidationError::InvalidAggregation(format!(
            "{:?} requires a field",
            aggregation.operation
        ))
        .into());
    }

    for group in &aggregation.groups {
        FieldValidator::validate(collection, &group.field)?;
    }
    Ok(())
}

/// Every key of a written record must be a column accepting the value
pub fn validate_record(record: &RecordData, collection: &dyn Collection) -> Result<()> {
    let schema = collection.schema();
    for (field, value) in record {
        let Some(column) = schema.column(field) else {
            return Err(ValidationError::FieldNotFound {
                field: field.clone(),
                collection: collection.name().to_string(),
            }
            .into());
        };
        FieldValidator::validate_value(column, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::DataSource;
    use crate::error::Error;
    use crate::query::{ConditionTree, Operator, Sort};
    use crate::testing;
    use serde_json::{json, Value};

    fn check(field: &str, operator: Operator, value: Value) -> Result<()> {
        let library = testing::library_schema_only();
        let books = library.get_collection("books")?;
        validate_condition_tree(&ConditionTree::leaf(field, operator, value), books.as_ref())
    }

    fn validation_error(result: Result<()>) -> ValidationError {
        match result {
            Err(Error::Validation(err)) => err,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_valid_leaves() {
        assert!(check("title", Operator::Contains, json!("Found")).is_ok());
        assert!(check("year", Operator::GreaterThan, json!(1950)).is_ok());
        assert!(check("id", Operator::In, json!([1, 2])).is_ok());
        assert!(check("id", Operator::In, json!([])).is_ok());
        assert!(check("author:name", Operator::Equal, json!("Isaac Asimov")).is_ok());
        assert!(check("title", Operator::Present, Value::Null).is_ok());
        assert!(check("genre", Operator::In, json!(["sf", "fantasy"])).is_ok());
        assert!(check("published", Operator::LessThan, json!("1960-01-01T00:00:00Z")).is_ok());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = validation_error(check("isbn", Operator::Equal, json!("x")));
        assert_eq!(err.to_string(), "Field 'isbn' not found on collection 'books'");

        let err = validation_error(check("author:nickname", Operator::Equal, json!("x")));
        assert_eq!(err.to_string(), "Field 'nickname' not found on collection 'persons'");
    }

    #[test]
    fn rejects_traversing_a_column_or_a_to_many_relation() {
        let err = validation_error(check("title:name", Operator::Equal, json!("x")));
        assert!(matches!(err, ValidationError::UnexpectedFieldType { .. }));

        let err = validation_error(check("author", Operator::Present, Value::Null));
        assert!(matches!(err, ValidationError::UnexpectedFieldType { ref found, .. } if found == "ManyToOne"));
    }

    #[test]
    fn rejects_operator_not_allowed_for_column_type() {
        let err = validation_error(check("year", Operator::Contains, json!(1)));
        assert_eq!(
            err.to_string(),
            "The given operator 'contains' is not allowed with the columnType schema: 'Number'.\n\
             The allowed types are: [blank,equal,missing,not_equal,present,greater_than,less_than,greater_than_or_equal,less_than_or_equal,in,not_in]"
        );
    }

    #[test]
    fn rejects_undeclared_operator() {
        let err = validation_error(check("year", Operator::GreaterThanOrEqual, json!(1950)));
        assert!(matches!(err, ValidationError::UnsupportedOperator { operator: Operator::GreaterThanOrEqual, .. }));
    }

    #[test]
    fn rejects_value_of_wrong_type() {
        let err = validation_error(check("year", Operator::GreaterThan, json!("1950")));
        assert!(matches!(err, ValidationError::ValueNotAllowedForOperator { .. }));
        assert!(err.to_string().contains("[Date,Dateonly,Number,Timeonly]"));

        let err = validation_error(check("year", Operator::Equal, json!("1950")));
        assert!(matches!(err, ValidationError::ValueNotAllowedForColumnType { .. }));
    }

    #[test]
    fn point_values_need_exactly_two_coordinates() {
        assert!(check("location", Operator::Equal, json!([-80, 20])).is_ok());
        let err = validation_error(check("location", Operator::Equal, json!([-80, 20, 90])));
        assert!(err.to_string().contains("ArrayOfNumber"));
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let err = validation_error(check("genre", Operator::Equal, json!("poetry")));
        assert_eq!(err.to_string(), "The given enum value(s) [poetry] is not listed in [sf,fantasy]");
    }

    #[test]
    fn branches_need_two_conditions() {
        let library = testing::library_schema_only();
        let books = library.get_collection("books").unwrap();
        let tree = ConditionTree::branch(
            crate::query::Aggregator::And,
            vec![ConditionTree::leaf("id", Operator::Equal, json!(1))],
        );

        let err = validation_error(validate_condition_tree(&tree, books.as_ref()));
        assert_eq!(err, ValidationError::TooFewConditions(1));
    }

    #[test]
    fn sort_and_projection_fields_must_exist() {
        let library = testing::library_schema_only();
        let books = library.get_collection("books").unwrap();

        let filter = PaginatedFilter::new().with_sort(Sort::ascending("author:name"));
        assert!(validate_paginated_filter(&filter, books.as_ref()).is_ok());

        let filter = PaginatedFilter::new().with_sort(Sort::ascending("rating"));
        assert!(validate_paginated_filter(&filter, books.as_ref()).is_err());

        assert!(validate_projection(&Projection::new(["id", "author:name"]), books.as_ref()).is_ok());
        assert!(validate_projection(&Projection::new(["id", "author:rating"]), books.as_ref()).is_err());
    }

    #[test]
    fn aggregation_fields_are_checked() {
        let library = testing::library_schema_only();
        let books = library.get_collection("books").unwrap();

        let sum_year = Aggregation::new(AggregationOperation::Sum, "year").group_by("genre", None);
        assert!(validate_aggregation(&sum_year, books.as_ref()).is_ok());

        let sum_title = Aggregation::new(AggregationOperation::Sum, "title");
        assert!(validate_aggregation(&sum_title, books.as_ref()).is_err());
    }

    #[test]
    fn written_records_must_fit_the_columns() {
        let library = testing::library_schema_only();
        let books = library.get_collection("books").unwrap();

        assert!(validate_record(&testing::record(json!({"id": 9, "title": "Hyperion"})), books.as_ref()).is_ok());
        assert!(validate_record(&testing::record(json!({"id": "nine"})), books.as_ref()).is_err());
        assert!(validate_record(&testing::record(json!({"isbn": "123"})), books.as_ref()).is_err());
        assert!(validate_record(&testing::record(json!({"genre": "poetry"})), books.as_ref()).is_err());
    }
}
