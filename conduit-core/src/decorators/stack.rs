//! Standard decorator stack

use super::operators_emulate::OperatorsEmulateDataSource;
use super::rename_field::RenameFieldDataSource;
use super::{DataSourceDecorator, OperatorReplacer, OperatorsEmulateCollection, RenameFieldCollection};
use crate::collection::{Collection, DataSource};
use crate::error::{Result, ValidationError};
use crate::query::Operator;
use crate::validation::rules;
use std::sync::Arc;

/// Layers applied on top of a data source, innermost first:
///
/// 1. operator emulation
/// 2. field renaming
///
/// Customizations address fields by their public (renamed) names.
pub struct DecoratorsStack {
    operators: Arc<OperatorsEmulateDataSource>,
    rename_field: Arc<RenameFieldDataSource>,
}

impl DecoratorsStack {
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        let operators = DataSourceDecorator::new(data_source, OperatorsEmulateCollection::new);
        let rename_field = DataSourceDecorator::new(operators.clone(), RenameFieldCollection::new);
        Self { operators, rename_field }
    }

    /// Outermost layer
    pub fn data_source(&self) -> Arc<dyn DataSource> {
        self.rename_field.clone()
    }

    pub fn customize_collection(&self, name: &str) -> Result<CollectionCustomizer<'_>> {
        self.rename_field.decorated(name)?;
        Ok(CollectionCustomizer { stack: self, name: name.to_string() })
    }
}

/// Customizes one collection of a [`DecoratorsStack`]
pub struct CollectionCustomizer<'a> {
    stack: &'a DecoratorsStack,
    name: String,
}

impl CollectionCustomizer<'_> {
    /// Field name as the operator layer knows it
    fn operators_field(&self, field: &str) -> Result<String> {
        self.stack.rename_field.decorated(&self.name)?.path_to_child(field)
    }

    pub fn emulate_field_operator(&self, field: &str, operator: Operator) -> Result<&Self> {
        let field = self.operators_field(field)?;
        self.stack.operators.decorated(&self.name)?.emulate_operator(&field, operator)?;
        Ok(self)
    }

    pub fn replace_field_operator(&self, field: &str, operator: Operator, replacer: OperatorReplacer) -> Result<&Self> {
        let field = self.operators_field(field)?;
        self.stack.operators.decorated(&self.name)?.implement_operator(&field, operator, replacer)?;
        Ok(self)
    }

    /// Emulate every operator the column type allows and the backend lacks
    pub fn emulate_field_filtering(&self, field: &str) -> Result<&Self> {
        let operators = self.stack.operators.decorated(&self.name)?;
        let child_field = self.operators_field(field)?;
        let column = operators.schema().column(&child_field).cloned().ok_or_else(|| ValidationError::FieldNotFound {
            field: field.to_string(),
            collection: self.name.clone(),
        })?;

        for operator in rules::operators_for_column_type(column.column_type) {
            if !column.filter_operators.contains(&operator) {
                operators.emulate_operator(&child_field, operator)?;
            }
        }
        Ok(self)
    }

    pub fn rename_field(&self, current: &str, new: &str) -> Result<&Self> {
        self.stack.rename_field.decorated(&self.name)?.rename_field(current, new)?;
        Ok(self)
    }
}
