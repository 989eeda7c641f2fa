//! Pattern matching module
//!
//! SQL `LIKE` style matching used when condition trees are evaluated in memory.

pub mod matcher;

pub use matcher::PatternMatcher;
