//! Identifier quoting and verbatim SQL fragments.

use std::fmt;

use crate::error::QueryResult;
use crate::expr::{Expression, Render};
use crate::filter::FilterValue;
use crate::placeholder::Placeholder;

/// Escape an identifier for use in SQL (double quotes, embedded quotes doubled).
pub fn escape_identifier(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// A dotted column reference whose segments are quoted individually.
///
/// ```rust
/// use sift_query::Field;
///
/// assert_eq!(Field::new("p.name").to_string(), r#""p"."name""#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field(String);

impl Field {
    /// Create a field reference from a dotted name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The unquoted name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.split('.').enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&escape_identifier(segment))?;
        }
        Ok(())
    }
}

/// A MySQL identifier quoted with backticks. Empty names stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MysqlIdent(String);

impl MysqlIdent {
    /// Wrap an unquoted identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for MysqlIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "`{}`", self.0.replace('`', "``"))
    }
}

/// A verbatim SQL fragment.
///
/// Displays as-is when used as a term or column, and renders as `(text)` with
/// no bound values when used as a condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawSql(String);

impl RawSql {
    /// Wrap a fragment. It is never escaped.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The fragment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Render for RawSql {
    fn render(&self, sb: &mut String, _ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        if !self.is_empty() {
            sb.push('(');
            sb.push_str(&self.0);
            sb.push(')');
        }
        Ok(Vec::new())
    }

    fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<RawSql> for Expression {
    fn from(raw: RawSql) -> Self {
        Expression::nested(raw)
    }
}
