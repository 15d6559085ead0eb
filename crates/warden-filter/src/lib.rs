//! # warden-filter: list-filter compiler for `Warden`
//!
//! Turns the ordered filter clauses of a list operation into a
//! storage-ready predicate.
//!
//! ## Operators
//!
//! | Operator             | Operands            | Rendered                                  |
//! |----------------------|---------------------|-------------------------------------------|
//! | `EQUALS` .. `GREATER_THAN_EQUAL` | `value` | `col = ?`, `col != ?`, `col < ?`, ...    |
//! | `IS`                 | `value`             | `col IS ?`                                |
//! | `IS_NULL`, `IS_NOT_NULL` | none            | `col IS NULL`, `col IS NOT NULL`          |
//! | `IN`, `NOT_IN`       | `values` (1 or more)| `col IN (?, ?)`, `col NOT IN (?, ?)`      |
//! | `LIKE`, `ILIKE`, `NOT_LIKE` | `value`      | `col LIKE ?`, ...                         |
//! | `MATCH`              | `value`             | `MATCH(col) AGAINST (? IN BOOLEAN MODE)`  |
//! | `BETWEEN`            | `values` (exactly 2)| `col BETWEEN ? AND ?`                     |
//!
//! Field names are converted to storage-column convention
//! (`createdAt` → `created_at`) and must be plain identifiers.
//!
//! ## Usage
//!
//! ```
//! use warden_filter::{FilterClause, FilterCompiler, FilterOp};
//!
//! let compiler = FilterCompiler::default();
//! let predicate = compiler
//!     .compile(&[
//!         FilterClause::new("createdAt", FilterOp::Between).with_values(["2024-01-01", "2024-12-31"]),
//!         FilterClause::new("status", FilterOp::Equals).with_value("active"),
//!     ])
//!     .unwrap();
//!
//! let rendered = compiler.render(&predicate);
//! assert_eq!(rendered.sql, "created_at BETWEEN ? AND ? AND status = ?");
//! assert_eq!(rendered.params.len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod clause;
mod compiler;
mod predicate;

#[cfg(test)]
mod tests;

pub use clause::{Arity, FilterClause, FilterOp, LinkOp, Scalar};
pub use compiler::{FilterCompiler, FilterSettings};
pub use predicate::{Condition, Placeholder, Predicate, RenderedPredicate};

/// A malformed filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("operation [{op}] on field {field} needs {expected}")]
    Arity {
        field: String,
        op: FilterOp,
        expected: &'static str,
    },

    #[error("operation [{op}] on field {field} needs the field [value] to compare")]
    MissingValue { field: String, op: FilterOp },

    #[error("invalid filter field: {0:?}")]
    InvalidField(String),
}

/// Result type for filter compilation.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Sort order of a list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Pagination and ordering of a list operation. Not interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub sort_direction: Option<SortDirection>,
}

/// Everything a list operation hands to the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    pub rendered: RenderedPredicate,
    pub options: ListOptions,
}
