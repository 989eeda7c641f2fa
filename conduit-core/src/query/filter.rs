//! Filters
//!
//! A [`Filter`] restricts the records an operation touches. A
//! [`PaginatedFilter`] adds ordering and a page window for reads.

use crate::error::{Result, ValidationError};
use crate::query::{ConditionTree, Page, Sort};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_tree: Option<ConditionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_extended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: ConditionTree) -> Self {
        Self { condition_tree: Some(tree), ..Self::default() }
    }

    /// Copy of the filter with the condition tree replaced
    pub fn with_condition_tree(self, condition_tree: Option<ConditionTree>) -> Self {
        Self { condition_tree, ..self }
    }

    pub fn with_search(self, search: Option<String>, search_extended: Option<bool>) -> Self {
        Self { search, search_extended, ..self }
    }

    pub fn with_segment(self, segment: Option<String>) -> Self {
        Self { segment, ..self }
    }

    /// A search or a segment cannot be expressed on another collection
    pub fn is_nestable(&self) -> bool {
        self.search.is_none() && self.segment.is_none()
    }

    /// Re-target the filter through the relation `prefix`
    pub fn nest(self, prefix: &str) -> Result<Self> {
        if !self.is_nestable() {
            return Err(ValidationError::NestedSearch.into());
        }
        Ok(Self { condition_tree: self.condition_tree.map(|tree| tree.nest(prefix)), ..self })
    }

    /// Strip the relation prefix shared by every condition
    pub fn unnest(self) -> Result<Self> {
        if !self.is_nestable() {
            return Err(ValidationError::NestedSearch.into());
        }
        let condition_tree = self.condition_tree.map(ConditionTree::unnest).transpose()?;
        Ok(Self { condition_tree, ..self })
    }
}

/// Filter with ordering and a page window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginatedFilter {
    #[serde(flatten)]
    pub filter: Filter,
    #[serde(default, skip_serializing_if = "Sort::is_empty")]
    pub sort: Sort,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

impl Deref for PaginatedFilter {
    type Target = Filter;

    fn deref(&self) -> &Filter {
        &self.filter
    }
}

impl From<Filter> for PaginatedFilter {
    fn from(filter: Filter) -> Self {
        Self { filter, ..Self::default() }
    }
}

impl PaginatedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: ConditionTree) -> Self {
        Filter::from_tree(tree).into()
    }

    pub fn with_condition_tree(self, condition_tree: Option<ConditionTree>) -> Self {
        Self { filter: self.filter.with_condition_tree(condition_tree), ..self }
    }

    pub fn with_sort(self, sort: Sort) -> Self {
        Self { sort, ..self }
    }

    pub fn with_page(self, page: Option<Page>) -> Self {
        Self { page, ..self }
    }

    /// Drop sort and page
    pub fn into_filter(self) -> Filter {
        self.filter
    }

    pub fn nest(self, prefix: &str) -> Result<Self> {
        Ok(Self { filter: self.filter.nest(prefix)?, sort: self.sort.nest(prefix), page: self.page })
    }

    /// Strip the relation prefix of conditions and sort clauses
    pub fn unnest(self) -> Result<Self> {
        let prefix = self
            .filter
            .condition_tree
            .as_ref()
            .and_then(|tree| tree.projection().fields().first().cloned())
            .or_else(|| self.sort.clauses().first().map(|clause| clause.field.clone()))
            .and_then(|field| field.split_once(':').map(|(prefix, _)| prefix.to_string()));

        let Some(prefix) = prefix else {
            return Ok(self);
        };
        Ok(Self { filter: self.filter.unnest()?, sort: self.sort.unnest(&prefix)?, page: self.page })
    }
}
