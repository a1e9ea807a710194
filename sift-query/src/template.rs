//! SELECT statements assembled from a caller-written template.
//!
//! The template is ordinary SQL with `{{TOKEN}}` markers. Substitution order
//! is fixed, and placeholders are numbered in that order:
//!
//! 1. `{{name_value}}` / `{{name}}` for every entry of the field values
//!    (a list value becomes `($n, $m, ...)`, a scalar becomes `$n`; the name
//!    token becomes the mapped column)
//! 2. `{{COLUMNS}}`
//! 3. `{{WHERE}}` (bare condition, `TRUE` when there is none)
//! 4. `{{GROUPBY}}`
//! 5. `{{HAVING}}` (bare condition, `TRUE` when there is none)
//! 6. `{{ORDERBY}}`, `{{LIMIT}}`, `{{OFFSET}}` (blank in count renders)
//!
//! ```rust
//! use sift_query::prelude::*;
//!
//! let (sql, args) = TemplateQuery::new("SELECT {{COLUMNS}} FROM t WHERE {{WHERE}}{{LIMIT}}")
//!     .columns(["id"])
//!     .r#where(Expr::eq("a", 1))
//!     .limit(5)
//!     .select()
//!     .unwrap();
//! assert_eq!(sql, "SELECT id FROM t WHERE (a = $1) LIMIT 5 ");
//! assert_eq!(args.len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{QueryError, QueryResult};
use crate::expr::{Expression, Render};
use crate::filter::FilterValue;
use crate::placeholder::{Placeholder, PlaceholderStyle};
use crate::query::{ClauseBuilder, Clauses, Selector, Statement, check_alignment};
use crate::tree::FieldMapper;

/// Template field values, substituted in insertion order.
pub type FieldValues = IndexMap<String, FilterValue>;

const COLUMNS: &str = "{{COLUMNS}}";
const WHERE: &str = "{{WHERE}}";
const GROUP_BY: &str = "{{GROUPBY}}";
const HAVING: &str = "{{HAVING}}";
const ORDER_BY: &str = "{{ORDERBY}}";
const LIMIT: &str = "{{LIMIT}}";
const OFFSET: &str = "{{OFFSET}}";

/// Builder for statements rendered from a template.
#[derive(Clone)]
pub struct TemplateQuery {
    select_template: String,
    count_template: Option<String>,
    mapper: Option<FieldMapper>,
    field_values: FieldValues,
    clauses: Clauses,
}

impl TemplateQuery {
    /// Create a template query from its select template.
    pub fn new(select_template: impl Into<String>) -> Self {
        Self {
            select_template: select_template.into(),
            count_template: None,
            mapper: None,
            field_values: FieldValues::new(),
            clauses: Clauses::default(),
        }
    }

    /// Template used by [`Selector::count`]. Blank templates fall back to the
    /// select template.
    pub fn count_template(mut self, template: impl Into<String>) -> Self {
        let template = template.into();
        self.count_template = (!template.trim().is_empty()).then_some(template);
        self
    }

    /// Map `{{name}}` tokens to column text. Without a mapper the name is
    /// used as-is.
    pub fn field_mapper<F>(self, mapper: F) -> Self
    where
        F: Fn(&str) -> QueryResult<String> + Send + Sync + 'static,
    {
        self.with_mapper(Arc::new(mapper))
    }

    /// Set a shared field mapper.
    pub fn with_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Replace all field values.
    pub fn field_values(mut self, values: FieldValues) -> Self {
        self.field_values = values;
        self
    }

    /// Add one field value.
    pub fn field_value(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.field_values.insert(name.into(), value.into());
        self
    }

    fn map_field(&self, name: &str) -> QueryResult<String> {
        match &self.mapper {
            Some(mapper) => mapper(name),
            None => Ok(name.to_string()),
        }
    }

    fn render_template(
        &self,
        template: &str,
        ph: &mut dyn Placeholder,
        cols: &[String],
        count: bool,
    ) -> QueryResult<Statement> {
        let mut query = template.trim().to_string();
        check_prefix(&query)?;
        crate::sift_trace!(
            fields = self.field_values.len(),
            count = count,
            "TemplateQuery substitution"
        );

        let c = &self.clauses;
        if c.has_where() && !query.contains(WHERE) {
            return Err(QueryError::malformed_template(
                "Template has no {{WHERE}} token but WHERE conditions were given",
            ));
        }
        if c.has_having() && !query.contains(HAVING) {
            return Err(QueryError::malformed_template(
                "Template has no {{HAVING}} token but HAVING conditions were given",
            ));
        }
        if ph.style() == PlaceholderStyle::QuestionMark {
            self.check_binding_order(&query)?;
        }

        let start = ph.position();
        let mut args = Vec::new();

        for (name, value) in &self.field_values {
            let value_token = value_token(name);
            if query.contains(&value_token) {
                let text = bind_field_value(name, value, ph, &mut args)?;
                query = query.replace(&value_token, &text);
            }

            let field_token = field_token(name);
            if query.contains(&field_token) {
                let column = self.map_field(name)?;
                query = query.replace(&field_token, &column);
            }
        }

        let columns = if count {
            "COUNT(*)".to_string()
        } else if cols.is_empty() {
            "*".to_string()
        } else {
            cols.join(", ")
        };
        query = query.replace(COLUMNS, &columns);

        if query.contains(WHERE) {
            let text = write_condition(ph, &c.where_exprs, &mut args)?;
            query = query.replace(WHERE, &text);
        }

        let group_by = match &c.group_by {
            Some(clause) => format!(" GROUP BY {} ", clause),
            None => String::new(),
        };
        query = query.replace(GROUP_BY, &group_by);

        if query.contains(HAVING) {
            let text = write_condition(ph, &c.having_exprs, &mut args)?;
            query = query.replace(HAVING, &text);
        }

        let mut order_by = String::new();
        let mut limit = String::new();
        let mut offset = String::new();
        if !count {
            if let Some(clause) = &c.order_by {
                order_by = format!(" ORDER BY {} ", clause);
            }
            if let Some(n) = c.limit {
                limit = format!(" LIMIT {} ", n);
            }
            if c.offset > 0 {
                offset = format!(" OFFSET {} ", c.offset);
            }
        }
        query = query.replace(ORDER_BY, &order_by);
        query = query.replace(LIMIT, &limit);
        query = query.replace(OFFSET, &offset);

        if let Some(token) = unresolved_token(&query) {
            return Err(
                QueryError::malformed_template(format!("Unresolved template token {}", token))
                    .with_sql(query.clone()),
            );
        }

        check_alignment(ph, start, &args)?;
        Ok((query, args))
    }

    /// With `?` placeholders, values bind by position in the text, so every
    /// binding token must appear at most once and in substitution order.
    fn check_binding_order(&self, template: &str) -> QueryResult<()> {
        let mut tokens: Vec<String> = self.field_values.keys().map(|n| value_token(n)).collect();
        if self.clauses.has_where() {
            tokens.push(WHERE.to_string());
        }
        if self.clauses.has_having() {
            tokens.push(HAVING.to_string());
        }

        let mut last: Option<(usize, &str)> = None;
        for token in &tokens {
            let found: Vec<usize> = template.match_indices(token.as_str()).map(|(i, _)| i).collect();
            match found.as_slice() {
                [] => {}
                [at] => {
                    if let Some((prev_at, prev)) = last {
                        if *at < prev_at {
                            return Err(QueryError::malformed_template(format!(
                                "{} must come after {} when using `?` placeholders",
                                token, prev
                            )));
                        }
                    }
                    last = Some((*at, token.as_str()));
                }
                _ => {
                    return Err(QueryError::malformed_template(format!(
                        "{} appears more than once, which `?` placeholders cannot express",
                        token
                    )));
                }
            }
        }
        Ok(())
    }

    fn standalone(&self, template: &str, cols: &[String], count: bool) -> QueryResult<Statement> {
        let mut ph = self.clauses.generator()?;
        let (sql, args) = self.render_template(template, ph.as_mut(), cols, count)?;
        self.clauses.log(
            if count { "TemplateQuery::count()" } else { "TemplateQuery::select()" },
            &sql,
            &args,
        );
        Ok((sql, args))
    }
}

fn field_token(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

fn value_token(name: &str) -> String {
    format!("{{{{{}_value}}}}", name)
}

fn has_keyword_prefix(text: &str, keyword: &str) -> bool {
    text.get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
        && text[keyword.len()..].starts_with(char::is_whitespace)
}

fn check_prefix(template: &str) -> QueryResult<()> {
    if has_keyword_prefix(template, "SELECT") || has_keyword_prefix(template, "WITH") {
        Ok(())
    } else {
        Err(QueryError::malformed_template(
            "Query template must begin with SELECT or WITH",
        ))
    }
}

fn unresolved_token(query: &str) -> Option<&str> {
    let open = query.find("{{")?;
    let close = query[open..].find("}}")?;
    Some(&query[open..open + close + 2])
}

fn bind_field_value(
    name: &str,
    value: &FilterValue,
    ph: &mut dyn Placeholder,
    args: &mut Vec<FilterValue>,
) -> QueryResult<String> {
    match value {
        FilterValue::List(items) => {
            if items.is_empty() {
                return Err(QueryError::invalid_argument(format!(
                    "Field value list for `{}` is empty",
                    name
                ))
                .with_field(name));
            }
            let mut text = String::from("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    text.push_str(", ");
                }
                text.push_str(&ph.next());
                args.push(item.clone());
            }
            text.push(')');
            Ok(text)
        }
        scalar => {
            args.push(scalar.clone());
            Ok(ph.next().into_owned())
        }
    }
}

/// Bare condition text; several expressions are each parenthesized and
/// joined by AND.
fn write_condition(
    ph: &mut dyn Placeholder,
    exprs: &[Expression],
    args: &mut Vec<FilterValue>,
) -> QueryResult<String> {
    let live: Vec<&Expression> = exprs.iter().filter(|e| !e.is_empty()).collect();
    let mut sb = String::new();
    match live.as_slice() {
        [] => sb.push_str("TRUE"),
        [only] => args.extend(only.render(&mut sb, ph)?),
        _ => {
            for (i, expr) in live.iter().enumerate() {
                if i > 0 {
                    sb.push_str(" AND ");
                }
                sb.push('(');
                args.extend(expr.render(&mut sb, ph)?);
                sb.push(')');
            }
        }
    }
    Ok(sb)
}

impl ClauseBuilder for TemplateQuery {
    fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    fn clauses_mut(&mut self) -> &mut Clauses {
        &mut self.clauses
    }
}

impl Selector for TemplateQuery {
    fn build(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        let (sql, args) =
            self.render_template(&self.select_template, ph, &self.clauses.columns, false)?;
        sb.push_str(&sql);
        Ok(args)
    }

    fn select(&self) -> QueryResult<Statement> {
        self.standalone(&self.select_template, &self.clauses.columns, false)
    }

    fn select_columns(&self, cols: &[String]) -> QueryResult<Statement> {
        if cols.is_empty() {
            return self.select();
        }
        self.standalone(&self.select_template, cols, false)
    }

    fn count(&self) -> QueryResult<Statement> {
        let template = self
            .count_template
            .as_deref()
            .unwrap_or(&self.select_template);
        self.standalone(template, &[], true)
    }
}

impl fmt::Debug for TemplateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateQuery")
            .field("select_template", &self.select_template)
            .field("count_template", &self.count_template)
            .field("has_mapper", &self.mapper.is_some())
            .field("field_values", &self.field_values)
            .field("clauses", &self.clauses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::expr::Expr;
    use crate::tree::Tree;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = "
        SELECT DISTINCT {{COLUMNS}} FROM country AS tc
        LEFT JOIN district AS td ON tc.id = td.id
        WHERE {{WHERE}} AND {{idField}} IN {{idField_value}}
        {{GROUPBY}}{{ORDERBY}}{{LIMIT}}{{OFFSET}}
    ";

    fn quoted(field: &str) -> QueryResult<String> {
        Ok(format!("\"{}\"", field))
    }

    #[test]
    fn test_field_values_are_numbered_first() {
        let tree = Tree::parse_str(r#"{"age": {"$between": [20, 30]}}"#)
            .unwrap()
            .with_field_mapper(quoted);
        let (sql, args) = TemplateQuery::new(TEMPLATE)
            .field_mapper(quoted)
            .field_value("idField", vec!["one", "two", "", "%"])
            .columns(["tc.name"])
            .r#where(tree)
            .limit(10)
            .offset(3)
            .select()
            .unwrap();

        assert!(sql.starts_with("SELECT DISTINCT tc.name FROM country AS tc"));
        assert!(sql.contains(r#"WHERE (("age" BETWEEN $5 AND $6)) AND "idField" IN ($1, $2, $3, $4)"#));
        assert!(sql.ends_with(" LIMIT 10  OFFSET 3 "));
        assert_eq!(args.len(), 6);
        assert_eq!(args[0], FilterValue::String("one".into()));
        assert_eq!(args[4], FilterValue::Int(20));
    }

    #[test]
    fn test_count_uses_count_template() {
        let q = TemplateQuery::new(TEMPLATE)
            .count_template("SELECT COUNT(*) FROM country WHERE {{WHERE}}")
            .r#where(Expr::eq("a", 1))
            .limit(10);
        let (sql, args) = q.count().unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM country WHERE (a = $1)");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_count_falls_back_to_select_template() {
        let (sql, _) = TemplateQuery::new("SELECT {{COLUMNS}} FROM t {{ORDERBY}}{{LIMIT}}")
            .count_template("   ")
            .columns(["a"])
            .order_by("a")
            .limit(3)
            .count()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM t ");
    }

    #[test]
    fn test_several_where_expressions_are_parenthesized() {
        let (sql, _) = TemplateQuery::new("SELECT * FROM t WHERE {{WHERE}}")
            .r#where(Expr::eq("a", 1))
            .r#where(Expr::eq("b", 2))
            .select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE ((a = $1)) AND ((b = $2))");
    }

    #[test]
    fn test_missing_where_renders_true() {
        let (sql, args) = TemplateQuery::new("SELECT * FROM t WHERE {{WHERE}}")
            .select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE TRUE");
        assert!(args.is_empty());
    }

    #[test]
    fn test_group_by_and_having() {
        let (sql, args) = TemplateQuery::new(
            "SELECT a, COUNT(*) FROM t{{GROUPBY}}HAVING {{HAVING}}",
        )
        .group_by("a")
        .having(Expr::raw("COUNT(*) > ?", [2]))
        .select()
        .unwrap();
        assert_eq!(sql, "SELECT a, COUNT(*) FROM t GROUP BY a HAVING (COUNT(*) > $1)");
        assert_eq!(args, vec![FilterValue::Int(2)]);
    }

    #[test]
    fn test_rejects_bad_prefix() {
        for template in ["DELETE FROM t", "SELECTX", "", "WITH"] {
            let err = TemplateQuery::new(template).select().unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedTemplate, "{template:?}");
        }
        assert!(TemplateQuery::new("  with x as (select 1) select * from x").select().is_ok());
    }

    #[test]
    fn test_unresolved_token() {
        let err = TemplateQuery::new("SELECT * FROM t WHERE id = {{id_value}}")
            .select()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedTemplate);
        assert!(err.message.contains("{{id_value}}"));
    }

    #[test]
    fn test_where_without_token_is_rejected() {
        let err = TemplateQuery::new("SELECT * FROM t")
            .r#where(Expr::eq("a", 1))
            .select()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedTemplate);
    }

    #[test]
    fn test_empty_list_value_is_rejected() {
        let err = TemplateQuery::new("SELECT * FROM t WHERE id IN {{id_value}}")
            .field_value("id", FilterValue::List(vec![]))
            .select()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_field_mapper_error() {
        let err = TemplateQuery::new("SELECT * FROM t WHERE {{id}} = {{id_value}}")
            .field_mapper(|f| Err(QueryError::field_mapping(f, "unknown")))
            .field_value("id", 1)
            .select()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FieldMapping);
    }

    #[test]
    fn test_question_mark_requires_textual_order() {
        let q = TemplateQuery::new("SELECT * FROM t WHERE {{WHERE}} AND id IN {{id_value}}")
            .field_value("id", vec![1, 2])
            .r#where(Expr::eq("a", 1))
            .placeholder_style(PlaceholderStyle::QuestionMark);
        let err = q.select().unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedTemplate);

        let (sql, args) = TemplateQuery::new("SELECT * FROM t WHERE id IN {{id_value}} AND {{WHERE}}")
            .field_value("id", vec![1, 2])
            .r#where(Expr::eq("a", 1))
            .placeholder_style(PlaceholderStyle::QuestionMark)
            .select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN (?, ?) AND (a = ?)");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_repeated_value_token_reuses_numbers() {
        let (sql, args) = TemplateQuery::new("SELECT * FROM t WHERE a = {{v_value}} OR b = {{v_value}}")
            .field_value("v", 9)
            .select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 OR b = $1");
        assert_eq!(args.len(), 1);
    }

    /// Draws a placeholder without binding a value for it.
    #[derive(Debug)]
    struct Unbound;

    impl Render for Unbound {
        fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
            sb.push_str(&ph.next());
            Ok(Vec::new())
        }

        fn is_empty(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_placeholder_argument_mismatch() {
        let q = TemplateQuery::new("SELECT * FROM t WHERE {{WHERE}}{{LIMIT}}")
            .r#where(Expression::nested(Unbound))
            .limit(5);
        assert_eq!(q.select().unwrap_err().code, ErrorCode::Consistency);
        assert_eq!(q.count().unwrap_err().code, ErrorCode::Consistency);

        let mut ph = crate::placeholder::NumberedPlaceholder::new();
        let mut sb = String::from("-- ");
        assert!(q.build(&mut sb, &mut ph).is_err());
        assert_eq!(sb, "-- ");
    }
}
