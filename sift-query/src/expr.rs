//! Composable SQL condition expressions.
//!
//! Every expression renders itself into a shared buffer, drawing tokens from
//! a shared [`Placeholder`] and returning the values to bind in the order the
//! tokens were drawn. Empty expressions render nothing and bind nothing, and
//! combinators skip them, so optional conditions can be assembled without
//! special-casing.
//!
//! ```rust
//! use sift_query::{Expr, Field, Render};
//!
//! let expr = Expr::and([
//!     Expr::eq(Field::new("p.status"), "active"),
//!     Expr::between("age", 20, 30),
//! ]);
//! let (sql, args) = expr.to_sql().unwrap();
//! assert_eq!(sql, r#"(("p"."status" = $1) AND (age BETWEEN $2 AND $3))"#);
//! assert_eq!(args.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::operator::keyword;
use crate::placeholder::{Placeholder, PlaceholderStyle};

/// Something that can be written into a SQL statement as a condition.
pub trait Render: fmt::Debug {
    /// Append SQL text to `sb`, drawing placeholder tokens from `ph`, and
    /// return the bound values in token order.
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>>;

    /// True when rendering would produce no text and no values.
    fn is_empty(&self) -> bool;

    /// Render standalone with `$n` placeholders starting at `$1`.
    fn to_sql(&self) -> QueryResult<(String, Vec<FilterValue>)> {
        self.to_sql_with(PlaceholderStyle::Numbered)
    }

    /// Render standalone with a fresh generator of the given style.
    fn to_sql_with(&self, style: PlaceholderStyle) -> QueryResult<(String, Vec<FilterValue>)> {
        let mut ph = style.generator(1)?;
        let mut sb = String::new();
        let args = self.render(&mut sb, ph.as_mut())?;
        Ok((sb, args))
    }
}

impl<T: Render + ?Sized> Render for &T {
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        (**self).render(sb, ph)
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}

impl<T: Render + ?Sized> Render for Box<T> {
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        (**self).render(sb, ph)
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}

impl<T: Render + ?Sized> Render for Arc<T> {
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        (**self).render(sb, ph)
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}

/// A condition tree node.
///
/// Terms are written verbatim; use [`crate::Field`] to get quoted column
/// references.
#[derive(Debug, Clone)]
pub enum Expression {
    /// `(term OP)`, e.g. `(deleted_at IS NULL)`.
    Postfix { term: String, op: &'static str },
    /// `(NOT inner)`.
    Not(Box<Expression>),
    /// `(term OP $n)`.
    Binary {
        term: String,
        op: &'static str,
        arg: FilterValue,
    },
    /// `(term OP1 $n OP2 $m)`, e.g. BETWEEN ... AND ...
    Ternary {
        term: String,
        op1: &'static str,
        op2: &'static str,
        arg1: FilterValue,
        arg2: FilterValue,
    },
    /// `(term IN ($n, $m, ...))`; empty when there are no members.
    ArrayMembership {
        term: String,
        op: &'static str,
        args: Vec<FilterValue>,
    },
    /// Children joined by AND/OR, skipping empty ones.
    Combinator {
        op: &'static str,
        children: Vec<Expression>,
    },
    /// A verbatim fragment with `?` markers, rendered as `(text)`.
    Raw { text: String, args: Vec<FilterValue> },
    /// Any other renderable condition, such as a compiled filter tree.
    Nested(Arc<dyn Render + Send + Sync>),
}

impl Expression {
    /// An expression that renders nothing.
    pub fn empty() -> Self {
        Self::Combinator {
            op: keyword::AND,
            children: Vec::new(),
        }
    }

    /// Wrap any renderable condition.
    pub fn nested(inner: impl Render + Send + Sync + 'static) -> Self {
        Self::Nested(Arc::new(inner))
    }
}

impl Default for Expression {
    fn default() -> Self {
        Self::empty()
    }
}

impl Render for Expression {
    fn is_empty(&self) -> bool {
        match self {
            Self::Postfix { .. } | Self::Binary { .. } | Self::Ternary { .. } => false,
            Self::Not(inner) => inner.is_empty(),
            Self::ArrayMembership { args, .. } => args.is_empty(),
            Self::Combinator { children, .. } => children.iter().all(Render::is_empty),
            Self::Raw { text, .. } => text.trim().is_empty(),
            Self::Nested(inner) => inner.is_empty(),
        }
    }

    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        // a failed child must not leave a half-written group behind
        let mark = sb.len();
        let result = self.write(sb, ph);
        if result.is_err() {
            sb.truncate(mark);
        }
        result
    }
}

impl Expression {
    fn write(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        match self {
            Self::Postfix { term, op } => {
                sb.push('(');
                sb.push_str(term);
                sb.push(' ');
                sb.push_str(op);
                sb.push(')');
                Ok(Vec::new())
            }
            Self::Not(inner) => {
                sb.push('(');
                sb.push_str(keyword::NOT);
                sb.push(' ');
                let args = inner.render(sb, ph)?;
                sb.push(')');
                Ok(args)
            }
            Self::Binary { term, op, arg } => {
                sb.push('(');
                sb.push_str(term);
                sb.push(' ');
                sb.push_str(op);
                sb.push(' ');
                sb.push_str(&ph.next());
                sb.push(')');
                Ok(vec![arg.clone()])
            }
            Self::Ternary {
                term,
                op1,
                op2,
                arg1,
                arg2,
            } => {
                sb.push('(');
                sb.push_str(term);
                sb.push(' ');
                sb.push_str(op1);
                sb.push(' ');
                sb.push_str(&ph.next());
                sb.push(' ');
                sb.push_str(op2);
                sb.push(' ');
                sb.push_str(&ph.next());
                sb.push(')');
                Ok(vec![arg1.clone(), arg2.clone()])
            }
            Self::ArrayMembership { term, op, args } => {
                sb.push('(');
                sb.push_str(term);
                sb.push(' ');
                sb.push_str(op);
                sb.push_str(" (");
                for i in 0..args.len() {
                    if i > 0 {
                        sb.push_str(", ");
                    }
                    sb.push_str(&ph.next());
                }
                sb.push_str("))");
                Ok(args.clone())
            }
            Self::Combinator { op, children } => {
                let live: Vec<&Expression> = children.iter().filter(|c| !c.is_empty()).collect();
                if let [only] = live.as_slice() {
                    return only.render(sb, ph);
                }

                let mut args = Vec::new();
                sb.push('(');
                for (i, child) in live.iter().enumerate() {
                    if i > 0 {
                        sb.push(' ');
                        sb.push_str(op);
                        sb.push(' ');
                    }
                    args.extend(child.render(sb, ph)?);
                }
                sb.push(')');
                Ok(args)
            }
            Self::Raw { text, args } => {
                let (expanded, args) = expand_list_args(text, args)?;
                sb.push('(');
                for c in expanded.chars() {
                    if c == '?' {
                        sb.push_str(&ph.next());
                    } else {
                        sb.push(c);
                    }
                }
                sb.push(')');
                Ok(args)
            }
            Self::Nested(inner) => inner.render(sb, ph),
        }
    }
}

/// Expand every list argument of a raw fragment into one `?` per element.
///
/// `?` markers are matched to arguments positionally; a mismatch between the
/// two counts, or an empty list, is an error.
pub fn expand_list_args(
    text: &str,
    args: &[FilterValue],
) -> QueryResult<(String, Vec<FilterValue>)> {
    let markers = text.matches('?').count();
    if markers != args.len() {
        return Err(QueryError::invalid_argument(format!(
            "Raw fragment has {} `?` markers but {} arguments",
            markers,
            args.len()
        ))
        .with_sql(text));
    }

    let mut expanded = String::with_capacity(text.len());
    let mut flat = Vec::with_capacity(args.len());
    let mut remaining = args.iter();
    for c in text.chars() {
        if c != '?' {
            expanded.push(c);
            continue;
        }
        match remaining.next() {
            Some(FilterValue::List(items)) => {
                if items.is_empty() {
                    return Err(QueryError::invalid_argument(
                        "Empty list passed as a raw fragment argument",
                    )
                    .with_sql(text));
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        expanded.push_str(", ");
                    }
                    expanded.push('?');
                    flat.push(item.clone());
                }
            }
            Some(value) => {
                expanded.push('?');
                flat.push(value.clone());
            }
            None => return Err(QueryError::internal("raw fragment argument count drifted")),
        }
    }

    Ok((expanded, flat))
}

/// Constructors for [`Expression`] nodes.
///
/// Terms accept anything displayable: plain strings are written verbatim,
/// [`crate::Field`] values are quoted.
pub struct Expr;

impl Expr {
    /// AND of all non-empty children.
    pub fn and(exprs: impl IntoIterator<Item = impl Into<Expression>>) -> Expression {
        Expression::Combinator {
            op: keyword::AND,
            children: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// OR of all non-empty children.
    pub fn or(exprs: impl IntoIterator<Item = impl Into<Expression>>) -> Expression {
        Expression::Combinator {
            op: keyword::OR,
            children: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// `(NOT expr)`.
    pub fn not(expr: impl Into<Expression>) -> Expression {
        Expression::Not(Box::new(expr.into()))
    }

    /// `(term IS NULL)`.
    pub fn null(term: impl fmt::Display) -> Expression {
        Self::postfix(term, keyword::IS_NULL)
    }

    /// `(term IS NOT NULL)`.
    pub fn not_null(term: impl fmt::Display) -> Expression {
        Self::postfix(term, keyword::IS_NOT_NULL)
    }

    /// `(term = $n)`.
    pub fn eq(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::EQ, arg)
    }

    /// `(term <> $n)`.
    pub fn neq(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::NEQ, arg)
    }

    /// `(term > $n)`.
    pub fn gt(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::GT, arg)
    }

    /// `(term >= $n)`.
    pub fn gte(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::GTE, arg)
    }

    /// `(term < $n)`.
    pub fn lt(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::LT, arg)
    }

    /// `(term <= $n)`.
    pub fn lte(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::LTE, arg)
    }

    /// `(term LIKE $n)`.
    pub fn like(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::LIKE, arg)
    }

    /// `(term ILIKE $n)`.
    pub fn ilike(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::ILIKE, arg)
    }

    /// `(term SIMILAR TO $n)`.
    pub fn similar_to(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::SIMILAR_TO, arg)
    }

    /// `(term NOT LIKE $n)`.
    pub fn not_like(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::NOT_LIKE, arg)
    }

    /// `(term NOT ILIKE $n)`.
    pub fn not_ilike(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::NOT_ILIKE, arg)
    }

    /// `(term NOT SIMILAR TO $n)`.
    pub fn not_similar_to(term: impl fmt::Display, arg: impl Into<FilterValue>) -> Expression {
        Self::binary(term, keyword::NOT_SIMILAR_TO, arg)
    }

    /// `(term BETWEEN $n AND $m)`.
    pub fn between(
        term: impl fmt::Display,
        low: impl Into<FilterValue>,
        high: impl Into<FilterValue>,
    ) -> Expression {
        Expression::Ternary {
            term: term.to_string(),
            op1: keyword::BETWEEN,
            op2: keyword::AND,
            arg1: low.into(),
            arg2: high.into(),
        }
    }

    /// `(term IN ($n, ...))`; empty when `args` is empty.
    pub fn is_in(
        term: impl fmt::Display,
        args: impl IntoIterator<Item = impl Into<FilterValue>>,
    ) -> Expression {
        Self::membership(term, keyword::IN, args)
    }

    /// `(term NOT IN ($n, ...))`; empty when `args` is empty.
    pub fn not_in(
        term: impl fmt::Display,
        args: impl IntoIterator<Item = impl Into<FilterValue>>,
    ) -> Expression {
        Self::membership(term, keyword::NOT_IN, args)
    }

    /// A verbatim fragment whose `?` markers are bound to `args` in order.
    ///
    /// List arguments expand to one marker per element, so
    /// `raw("id IN (?)", [vec![1, 2, 3]])` renders `(id IN ($1, $2, $3))`.
    pub fn raw(
        text: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<FilterValue>>,
    ) -> Expression {
        Expression::Raw {
            text: text.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A verbatim fragment without arguments.
    pub fn raw_sql(text: impl Into<String>) -> Expression {
        Expression::Raw {
            text: text.into(),
            args: Vec::new(),
        }
    }

    /// `(term op $n)` with an arbitrary operator keyword.
    pub fn binary(term: impl fmt::Display, op: &'static str, arg: impl Into<FilterValue>) -> Expression {
        Expression::Binary {
            term: term.to_string(),
            op,
            arg: arg.into(),
        }
    }

    /// `(term op)` with an arbitrary postfix keyword.
    pub fn postfix(term: impl fmt::Display, op: &'static str) -> Expression {
        Expression::Postfix {
            term: term.to_string(),
            op,
        }
    }

    fn membership(
        term: impl fmt::Display,
        op: &'static str,
        args: impl IntoIterator<Item = impl Into<FilterValue>>,
    ) -> Expression {
        Expression::ArrayMembership {
            term: term.to_string(),
            op,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Incrementally built condition.
///
/// Each `and`/`or` call wraps the current expression together with the new
/// ones in a single combinator.
///
/// ```rust
/// use sift_query::{Expr, FluentExpression, Render};
///
/// let cond = FluentExpression::new()
///     .set(Expr::eq("a", 1))
///     .or(Expr::eq("b", 2))
///     .and(Expr::not_null("c"));
/// let (sql, _) = cond.to_sql().unwrap();
/// assert_eq!(sql, "(((a = $1) OR (b = $2)) AND (c IS NOT NULL))");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FluentExpression {
    expr: Option<Expression>,
}

impl FluentExpression {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current expression.
    pub fn set(mut self, expr: impl Into<Expression>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    /// AND the current expression with `expr`.
    pub fn and(self, expr: impl Into<Expression>) -> Self {
        self.combine(keyword::AND, std::iter::once(expr.into()))
    }

    /// AND the current expression with every expression in `exprs`.
    pub fn and_all(self, exprs: impl IntoIterator<Item = impl Into<Expression>>) -> Self {
        self.combine(keyword::AND, exprs.into_iter().map(Into::into))
    }

    /// OR the current expression with `expr`.
    pub fn or(self, expr: impl Into<Expression>) -> Self {
        self.combine(keyword::OR, std::iter::once(expr.into()))
    }

    /// OR the current expression with every expression in `exprs`.
    pub fn or_all(self, exprs: impl IntoIterator<Item = impl Into<Expression>>) -> Self {
        self.combine(keyword::OR, exprs.into_iter().map(Into::into))
    }

    /// The current expression, if any was set.
    pub fn expression(&self) -> Option<&Expression> {
        self.expr.as_ref()
    }

    /// Take the current expression, or an empty one.
    pub fn into_expression(self) -> Expression {
        self.expr.unwrap_or_default()
    }

    fn combine(self, op: &'static str, more: impl Iterator<Item = Expression>) -> Self {
        let children: Vec<Expression> = self.expr.into_iter().chain(more).collect();
        Self {
            expr: Some(Expression::Combinator { op, children }),
        }
    }
}

impl Render for FluentExpression {
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        match &self.expr {
            Some(expr) => expr.render(sb, ph),
            None => Ok(Vec::new()),
        }
    }

    fn is_empty(&self) -> bool {
        self.expr.as_ref().is_none_or(Render::is_empty)
    }
}

impl From<FluentExpression> for Expression {
    fn from(fluent: FluentExpression) -> Self {
        fluent.into_expression()
    }
}
