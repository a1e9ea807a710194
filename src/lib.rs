//! # Sift
//!
//! Parameterized SQL conditions from JSON filter documents, with a fluent
//! builder for the `SELECT` statements that use them.
//!
//! Sift provides:
//! - A compiler from JSON filter documents (`{"age": {"$gte": 21}}`) to SQL conditions
//! - Composable condition expressions
//! - Statement assembly from parts or from SQL templates
//! - Sorting, pagination and search-request helpers for list endpoints
//!
//! ## Quick Start
//!
//! ```rust
//! use sift::prelude::*;
//!
//! let filter = Tree::parse(br#"{"status": "A", "$or": [{"qty": {"$lt": 30}}, {"item": {"$like": "p%"}}]}"#)
//!     .unwrap();
//!
//! let (sql, args) = Query::new()
//!     .from("inventory")
//!     .r#where(filter)
//!     .limit(10)
//!     .select()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM inventory WHERE ((status = $1) AND ((qty < $2) OR (item LIKE $3))) LIMIT 10"
//! );
//! assert_eq!(args.len(), 3);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Filter compilation and statement assembly.
pub mod query {
    pub use sift_query::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sift_query::prelude::*;
}

// Re-export key types at the crate root
pub use sift_query::{
    ErrorCode, Expr, Expression, FilterValue, Pagination, Query, QueryError, QueryResult,
    SiftConfig, TemplateQuery, Tree,
};
