//! # sift-query
//!
//! Parameterized SQL conditions from JSON filter documents, and a fluent
//! builder for the statements that use them.
//!
//! This crate provides:
//! - Filter trees compiled from JSON (`$and`, `$or`, `$not`, comparisons, `$in`, `$between`, ...)
//! - Composable condition expressions (`Expr`)
//! - `SELECT` assembly from parts (`Query`) or from a template (`TemplateQuery`)
//! - Numbered (`$1`) or question-mark (`?`) placeholders
//! - Sorting, pagination and search-request helpers
//!
//! ## Filter Trees
//!
//! ```rust
//! use sift_query::{Render, Tree};
//!
//! let tree = Tree::parse_str(r#"{"status": "A", "qty": {"$lt": 30}}"#).unwrap();
//! let (sql, args) = tree.to_sql().unwrap();
//! assert_eq!(sql, "((status = $1) AND (qty < $2))");
//! assert_eq!(args.len(), 2);
//! ```
//!
//! ## Expressions
//!
//! ```rust
//! use sift_query::{Expr, Render};
//!
//! let expr = Expr::or([Expr::eq("role", "admin"), Expr::is_in("id", vec![1, 2])]);
//! let (sql, _) = expr.to_sql().unwrap();
//! assert_eq!(sql, "((role = $1) OR (id IN ($2, $3)))");
//! ```
//!
//! ## Statements
//!
//! ```rust
//! use sift_query::prelude::*;
//!
//! let filter = Tree::parse_str(r#"{"age": {"$gte": 21}}"#).unwrap();
//! let (sql, args) = Query::new()
//!     .from("people")
//!     .columns(["id", "name"])
//!     .r#where(filter)
//!     .order_by("name")
//!     .limit(20)
//!     .select()
//!     .unwrap();
//! assert_eq!(sql, "SELECT id, name FROM people WHERE ((age >= $1)) ORDER BY name LIMIT 20");
//! assert_eq!(args, vec![FilterValue::Int(21)]);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use sift_query::{ErrorCode, Render, Tree};
//!
//! let err = Tree::parse_str(r#"{"a": {"$near": 1}}"#).unwrap().to_sql().unwrap_err();
//! assert_eq!(err.code, ErrorCode::UnknownOperator);
//! ```

pub mod config;
pub mod error;
pub mod expr;
pub mod filter;
pub mod logging;
pub mod mapping;
pub mod operator;
pub mod pagination;
pub mod placeholder;
pub mod query;
pub mod search;
pub mod sql;
pub mod template;
pub mod tree;
pub mod types;

pub use config::{DebugConfig, PaginationConfig, PlaceholderConfig, SiftConfig};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use expr::{Expr, Expression, FluentExpression, Render};
pub use filter::FilterValue;
pub use mapping::{SelectColumn, find_result_field, join_select_columns, map_quote_field, quote_select_fields};
pub use operator::Operator;
pub use pagination::Pagination;
pub use placeholder::{NumberedPlaceholder, Placeholder, PlaceholderStyle, QuestionMarkPlaceholder};
pub use query::{ClauseBuilder, Query, Selector, Statement};
pub use search::{DataList, EqFilter, ListSearchArg, QueryTerm, RefSearchArg, TemplateSearchArg};
pub use sql::{Field, MysqlIdent, RawSql, escape_identifier};
pub use template::{FieldValues, TemplateQuery};
pub use tree::{CompiledFilter, FieldMapper, Tree};
pub use types::{Sort, SortConditions, SortOrder};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::SiftConfig;
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::expr::{Expr, Expression, FluentExpression, Render};
    pub use crate::filter::FilterValue;
    pub use crate::pagination::Pagination;
    pub use crate::placeholder::{Placeholder, PlaceholderStyle};
    pub use crate::query::{ClauseBuilder, Query, Selector};
    pub use crate::search::{ListSearchArg, QueryTerm, TemplateSearchArg};
    pub use crate::sql::{Field, RawSql};
    pub use crate::template::TemplateQuery;
    pub use crate::tree::Tree;
    pub use crate::types::{Sort, SortConditions, SortOrder};
    pub use crate::query_error;
}
