//! Backend-independent query model
//!
//! - [`ConditionTree`] - boolean filter expressions
//! - [`Filter`] / [`PaginatedFilter`] - what an operation targets
//! - [`Projection`] - which fields a read returns
//! - [`Aggregation`] - grouped computations

pub mod aggregation;
pub mod condition_tree;
pub mod filter;
pub mod operator;
pub mod page;
pub mod projection;
pub mod sort;

pub use aggregation::{AggregateResult, Aggregation, AggregationGroup, AggregationOperation, DateOperation};
pub use condition_tree::{
    Aggregator, ConditionTree, ConditionTreeBranch, ConditionTreeFactory, ConditionTreeLeaf, ConditionTreeNot,
};
pub use filter::{Filter, PaginatedFilter};
pub use operator::Operator;
pub use page::Page;
pub use projection::Projection;
pub use sort::{Sort, SortClause};
