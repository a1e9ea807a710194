//! SELECT statement assembly.
//!
//! [`Query`] builds a statement from a source table, WHERE/HAVING
//! expressions and the usual trailing clauses:
//!
//! ```rust
//! use sift_query::prelude::*;
//!
//! let (sql, args) = Query::new()
//!     .from("employees")
//!     .r#where(Expr::gte("salary", 5000))
//!     .order_by("salary DESC")
//!     .limit(10)
//!     .select()
//!     .unwrap();
//! assert_eq!(sql, "SELECT * FROM employees WHERE (salary >= $1) ORDER BY salary DESC LIMIT 10");
//! assert_eq!(args.len(), 1);
//! ```

use std::fmt;

use tracing::debug;

use crate::config::SiftConfig;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Expression, Render};
use crate::filter::FilterValue;
use crate::placeholder::{Placeholder, PlaceholderStyle};

/// Rendered SQL text and the values to bind, in placeholder order.
pub type Statement = (String, Vec<FilterValue>);

/// Clause state shared by [`Query`] and [`crate::TemplateQuery`].
#[derive(Debug, Clone)]
pub struct Clauses {
    pub(crate) where_exprs: Vec<Expression>,
    pub(crate) having_exprs: Vec<Expression>,
    pub(crate) columns: Vec<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) order_by: Option<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: i64,
    pub(crate) style: PlaceholderStyle,
    pub(crate) start: i64,
    pub(crate) log_sql: bool,
}

impl Default for Clauses {
    fn default() -> Self {
        Self {
            where_exprs: Vec::new(),
            having_exprs: Vec::new(),
            columns: Vec::new(),
            group_by: None,
            order_by: None,
            limit: None,
            offset: 0,
            style: PlaceholderStyle::default(),
            start: 1,
            log_sql: false,
        }
    }
}

impl Clauses {
    /// The configured LIMIT, if any.
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// The configured OFFSET (zero when unset).
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The configured placeholder style.
    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    /// A fresh generator for a standalone render.
    pub(crate) fn generator(&self) -> QueryResult<Box<dyn Placeholder>> {
        self.style.generator(self.start)
    }

    pub(crate) fn has_where(&self) -> bool {
        self.where_exprs.iter().any(|e| !e.is_empty())
    }

    pub(crate) fn has_having(&self) -> bool {
        self.having_exprs.iter().any(|e| !e.is_empty())
    }

    pub(crate) fn log(&self, operation: &'static str, sql: &str, args: &[FilterValue]) {
        if self.log_sql {
            debug!(operation, sql = %sql, param_count = args.len(), "statement built");
        } else {
            debug!(operation, sql_len = sql.len(), param_count = args.len(), "statement built");
        }
    }
}

/// Render the non-empty expressions joined by AND, each written as-is.
pub(crate) fn write_conjunction(
    sb: &mut String,
    ph: &mut dyn Placeholder,
    exprs: &[Expression],
    args: &mut Vec<FilterValue>,
) -> QueryResult<()> {
    for (i, expr) in exprs.iter().filter(|e| !e.is_empty()).enumerate() {
        if i > 0 {
            sb.push_str(" AND ");
        }
        args.extend(expr.render(sb, ph)?);
    }
    Ok(())
}

/// Fail unless exactly one placeholder was drawn per bound value.
pub(crate) fn check_alignment(
    ph: &dyn Placeholder,
    start: usize,
    args: &[FilterValue],
) -> QueryResult<()> {
    let drawn = ph.position().saturating_sub(start);
    if drawn != args.len() {
        return Err(QueryError::consistency(drawn, args.len()));
    }
    Ok(())
}

/// Builder methods shared by the statement assemblers.
pub trait ClauseBuilder: Sized {
    /// Shared clause state.
    fn clauses(&self) -> &Clauses;

    /// Mutable shared clause state.
    fn clauses_mut(&mut self) -> &mut Clauses;

    /// Add a WHERE condition. Multiple conditions are joined with AND.
    fn r#where(mut self, expr: impl Into<Expression>) -> Self {
        self.clauses_mut().where_exprs.push(expr.into());
        self
    }

    /// Add a HAVING condition. Multiple conditions are joined with AND.
    fn having(mut self, expr: impl Into<Expression>) -> Self {
        self.clauses_mut().having_exprs.push(expr.into());
        self
    }

    /// Append select columns.
    fn columns(mut self, cols: impl IntoIterator<Item = impl fmt::Display>) -> Self {
        self.clauses_mut()
            .columns
            .extend(cols.into_iter().map(|c| c.to_string()));
        self
    }

    /// Set LIMIT.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not positive.
    fn limit(mut self, n: i64) -> Self {
        assert!(n > 0, "limit must be greater than 0");
        self.clauses_mut().limit = Some(n);
        self
    }

    /// Set LIMIT, rejecting non-positive values.
    fn try_limit(self, n: i64) -> QueryResult<Self> {
        if n <= 0 {
            return Err(QueryError::invalid_argument(format!(
                "limit must be greater than 0, got {}",
                n
            )));
        }
        Ok(self.limit(n))
    }

    /// Set OFFSET. Negative values are clamped to zero.
    fn offset(mut self, n: i64) -> Self {
        self.clauses_mut().offset = n.max(0);
        self
    }

    /// Shorthand for `limit(1)`.
    fn one(mut self) -> Self {
        self.clauses_mut().limit = Some(1);
        self
    }

    /// Set the ORDER BY clause text.
    fn order_by(mut self, clause: impl fmt::Display) -> Self {
        let clause = clause.to_string();
        self.clauses_mut().order_by = (!clause.trim().is_empty()).then_some(clause);
        self
    }

    /// Set the GROUP BY clause text.
    fn group_by(mut self, clause: impl fmt::Display) -> Self {
        let clause = clause.to_string();
        self.clauses_mut().group_by = (!clause.trim().is_empty()).then_some(clause);
        self
    }

    /// Choose the placeholder style for standalone renders.
    fn placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.clauses_mut().style = style;
        self
    }

    /// Number the first placeholder of standalone renders from `start`.
    fn placeholder_start(mut self, start: i64) -> Self {
        self.clauses_mut().start = start;
        self
    }

    /// Apply placeholder and logging settings from a configuration.
    fn with_config(mut self, config: &SiftConfig) -> Self {
        let clauses = self.clauses_mut();
        clauses.style = config.placeholder.style;
        clauses.start = config.placeholder.start;
        clauses.log_sql = config.debug.log_sql;
        self
    }
}

/// Statement renderers.
pub trait Selector {
    /// Render the select statement into `sb` using a caller-supplied
    /// generator, so it can be embedded in a larger statement.
    fn build(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>>;

    /// Render a select statement with the configured columns.
    fn select(&self) -> QueryResult<Statement>;

    /// Render a select statement with `cols` instead of the configured
    /// columns. An empty slice falls back to the configured columns.
    fn select_columns(&self, cols: &[String]) -> QueryResult<Statement>;

    /// Like [`Selector::select_columns`] for string slices.
    fn raw_select(&self, cols: &[&str]) -> QueryResult<Statement> {
        let cols: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
        self.select_columns(&cols)
    }

    /// Render a `COUNT(*)` statement without ORDER BY, LIMIT and OFFSET.
    fn count(&self) -> QueryResult<Statement>;
}

/// Builder for `SELECT ... FROM ...` statements.
#[derive(Debug, Clone, Default)]
pub struct Query {
    from: Option<String>,
    clauses: Clauses,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source table or join expression.
    pub fn from(mut self, source: impl fmt::Display) -> Self {
        let source = source.to_string();
        self.from = (!source.trim().is_empty()).then_some(source);
        self
    }

    /// True when no source has been set.
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
    }

    fn write(
        &self,
        sb: &mut String,
        ph: &mut dyn Placeholder,
        cols: &[String],
        count: bool,
    ) -> QueryResult<Vec<FilterValue>> {
        let mark = sb.len();
        let result = self.write_statement(sb, ph, cols, count);
        if result.is_err() {
            sb.truncate(mark);
        }
        result
    }

    fn write_statement(
        &self,
        sb: &mut String,
        ph: &mut dyn Placeholder,
        cols: &[String],
        count: bool,
    ) -> QueryResult<Vec<FilterValue>> {
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| QueryError::required_field("from").with_context("Query::select"))?;

        let start = ph.position();
        let mut args = Vec::new();

        sb.push_str("SELECT ");
        if count {
            sb.push_str("COUNT(*)");
        } else if cols.is_empty() {
            sb.push('*');
        } else {
            sb.push_str(&cols.join(", "));
        }
        sb.push_str(" FROM ");
        sb.push_str(from);

        let c = &self.clauses;
        if c.has_where() {
            sb.push_str(" WHERE ");
            write_conjunction(sb, ph, &c.where_exprs, &mut args)?;
        }

        if !count {
            if let Some(group_by) = &c.group_by {
                sb.push_str(" GROUP BY ");
                sb.push_str(group_by);
            }
        }

        if c.has_having() {
            sb.push_str(" HAVING ");
            write_conjunction(sb, ph, &c.having_exprs, &mut args)?;
        }

        if !count {
            if let Some(order_by) = &c.order_by {
                sb.push_str(" ORDER BY ");
                sb.push_str(order_by);
            }
            if let Some(limit) = c.limit {
                sb.push_str(&format!(" LIMIT {}", limit));
            }
            if c.offset > 0 {
                sb.push_str(&format!(" OFFSET {}", c.offset));
            }
        }

        check_alignment(ph, start, &args)?;
        Ok(args)
    }

    fn standalone(&self, cols: &[String], count: bool) -> QueryResult<Statement> {
        let mut ph = self.clauses.generator()?;
        let mut sb = String::with_capacity(64);
        let args = self.write(&mut sb, ph.as_mut(), cols, count)?;
        self.clauses
            .log(if count { "Query::count()" } else { "Query::select()" }, &sb, &args);
        Ok((sb, args))
    }
}

impl ClauseBuilder for Query {
    fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    fn clauses_mut(&mut self) -> &mut Clauses {
        &mut self.clauses
    }
}

impl Selector for Query {
    fn build(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        self.write(sb, ph, &self.clauses.columns, false)
    }

    fn select(&self) -> QueryResult<Statement> {
        self.standalone(&self.clauses.columns, false)
    }

    fn select_columns(&self, cols: &[String]) -> QueryResult<Statement> {
        if cols.is_empty() {
            return self.select();
        }
        self.standalone(cols, false)
    }

    fn count(&self) -> QueryResult<Statement> {
        self.standalone(&[], true)
    }
}
