//! Page-based pagination.
//!
//! ```rust
//! use sift_query::Pagination;
//!
//! let page = Pagination::new(3, 25).calculate(100);
//! assert_eq!(page.limit(), 25);
//! assert_eq!(page.offset(), 50);
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::PaginationConfig;
use crate::query::ClauseBuilder;

/// Global page size cap used when no other maximum is given.
pub const MAX_PER_PAGE: i64 = 500;

/// A requested page. `page` is 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    #[serde(default)]
    pub page: i64,
    /// Rows per page.
    #[serde(default)]
    pub per_page: i64,
    /// Opaque cursor for keyset pagination, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_key: Option<String>,
    #[serde(skip)]
    offset: i64,
}

impl Pagination {
    /// Request `page` with `per_page` rows.
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page,
            per_page,
            ..Self::default()
        }
    }

    /// True when neither a page nor a size was requested.
    pub fn is_zero(&self) -> bool {
        self.page == 0 && self.per_page == 0 && self.next_page_key.is_none()
    }

    /// Normalize the request and compute the offset.
    ///
    /// A non-positive `per_page` becomes `max_per_page` (or [`MAX_PER_PAGE`]
    /// when that is not positive either), larger requests are capped, and
    /// pages below 1 become 1.
    pub fn calculate(mut self, max_per_page: i64) -> Self {
        let max = if max_per_page > 0 { max_per_page } else { MAX_PER_PAGE };
        if self.per_page <= 0 {
            self.per_page = max;
        } else if self.per_page > max {
            warn!(requested = self.per_page, max, "per_page clamped");
            self.per_page = max;
        }
        if self.page < 1 {
            self.page = 1;
        }
        // request input; saturate instead of overflowing
        self.offset = (self.page - 1).saturating_mul(self.per_page);
        self
    }

    /// Like [`Pagination::calculate`], defaulting an unset size to
    /// `default_per_page` and capping at `max_per_page`.
    pub fn calculate_with(mut self, config: &PaginationConfig) -> Self {
        if self.per_page <= 0 {
            self.per_page = config.default_per_page;
        }
        self.calculate(config.max_per_page)
    }

    /// Rows per page after [`Pagination::calculate`].
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Set LIMIT and OFFSET on an assembler. A non-positive page size leaves
    /// the limit unset.
    pub fn apply<B: ClauseBuilder>(&self, builder: B) -> B {
        let builder = builder.offset(self.offset);
        if self.per_page > 0 {
            builder.limit(self.per_page)
        } else {
            builder
        }
    }
}
