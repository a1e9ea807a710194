//! Request-side search arguments for list endpoints.
//!
//! A list request carries an optional JSON filter document, a free-text
//! search term, sorting and pagination. These types deserialize such a
//! request and wire it into an assembler:
//!
//! ```rust
//! use std::collections::HashMap;
//! use sift_query::prelude::*;
//!
//! let arg: ListSearchArg = serde_json::from_str(r#"{
//!     "filter": {"age": {"$gte": 18}},
//!     "query": {"fields": ["name"], "matcher": "ilike", "term": "%ann%"},
//!     "sorts": [{"fields": ["age"], "order": "desc"}],
//!     "pagination": {"page": 2, "perPage": 10}
//! }"#).unwrap();
//!
//! let columns = HashMap::from([
//!     ("age".to_string(), "age".to_string()),
//!     ("name".to_string(), "full_name".to_string()),
//! ]);
//! let (sql, args) = arg.apply(Query::new().from("people"), &columns, 100).unwrap().select().unwrap();
//! assert_eq!(
//!     sql,
//!     r#"SELECT * FROM people WHERE (("age" >= $1)) AND ("full_name" ILIKE $2) ORDER BY ("age") DESC LIMIT 10 OFFSET 10"#
//! );
//! assert_eq!(args.len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryError, QueryResult};
use crate::expr::{Expr, Expression, Render};
use crate::filter::FilterValue;
use crate::mapping::map_quote_field;
use crate::operator::keyword;
use crate::pagination::Pagination;
use crate::query::{ClauseBuilder, Statement};
use crate::sql::escape_identifier;
use crate::template::{FieldValues, TemplateQuery};
use crate::tree::{FieldMapper, Tree};
use crate::types::SortConditions;

const MATCHERS: [&str; 9] = [
    keyword::LIKE,
    keyword::NOT_LIKE,
    keyword::ILIKE,
    keyword::SIMILAR_TO,
    keyword::NOT_SIMILAR_TO,
    keyword::REGEX_MATCH,
    keyword::IREGEX_MATCH,
    keyword::NOT_REGEX_MATCH,
    keyword::NOT_IREGEX_MATCH,
];

/// Resolve a matcher keyword, ignoring case and extra whitespace. An empty
/// matcher means `LIKE`.
fn lookup_matcher(matcher: &str) -> QueryResult<&'static str> {
    let normalized = matcher
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    if normalized.is_empty() {
        return Ok(keyword::LIKE);
    }
    MATCHERS
        .iter()
        .find(|m| **m == normalized)
        .copied()
        .ok_or_else(|| QueryError::invalid_matcher(matcher))
}

/// A free-text search term matched against one or more columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTerm {
    /// Logical fields to search. Empty means the caller's defaults.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Match keyword such as `ILIKE` or `~*`. Empty means `LIKE`.
    #[serde(default)]
    pub matcher: String,
    /// Pattern bound once per searched column.
    #[serde(default)]
    pub term: String,
}

impl QueryTerm {
    /// Search `fields` for `term` with `matcher`.
    pub fn new(
        fields: impl IntoIterator<Item = impl Into<String>>,
        matcher: impl Into<String>,
        term: impl Into<String>,
    ) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            matcher: matcher.into(),
            term: term.into(),
        }
    }

    /// True when there is nothing to search for.
    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty()
    }

    /// `(col MATCHER term)` for every column, joined by OR. Each column binds
    /// its own copy of the term.
    ///
    /// Fields go through `mapper` when given. With no fields and no
    /// `default_columns` (already column text) the expression is empty.
    pub fn to_expression(
        &self,
        mapper: Option<&FieldMapper>,
        default_columns: &[String],
    ) -> QueryResult<Expression> {
        if self.is_empty() {
            return Ok(Expression::empty());
        }
        let matcher = lookup_matcher(&self.matcher)?;

        let columns = if self.fields.is_empty() {
            default_columns.to_vec()
        } else {
            self.fields
                .iter()
                .map(|f| match mapper {
                    Some(mapper) => mapper(f),
                    None => Ok(f.clone()),
                })
                .collect::<QueryResult<Vec<_>>>()?
        };

        Ok(Expr::or(
            columns
                .iter()
                .map(|c| Expr::binary(c, matcher, self.term.as_str())),
        ))
    }

    /// Standalone numbered rendering of [`QueryTerm::to_expression`].
    pub fn to_sql_where(
        &self,
        mapper: Option<&FieldMapper>,
        default_columns: &[String],
    ) -> QueryResult<Statement> {
        self.to_expression(mapper, default_columns)?.to_sql()
    }
}

/// A single `field = value` match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqFilter {
    /// Logical field name.
    #[serde(default)]
    pub field: String,
    /// Value to match; null matches `IS NULL`.
    #[serde(default)]
    pub value: FilterValue,
}

impl EqFilter {
    /// Match `field` against `value`.
    pub fn new(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when no field is set.
    pub fn is_zero(&self) -> bool {
        self.field.is_empty()
    }

    /// `(col = $n)`, or `(col IS NULL)` for a null value.
    pub fn to_expression(&self, mapper: Option<&FieldMapper>) -> QueryResult<Expression> {
        if self.is_zero() {
            return Ok(Expression::empty());
        }
        let column = match mapper {
            Some(mapper) => mapper(&self.field)?,
            None => self.field.clone(),
        };
        Ok(if self.value.is_null() {
            Expr::null(column)
        } else {
            Expr::eq(column, self.value.clone())
        })
    }
}

/// Arguments of a list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSearchArg {
    /// Requested ordering.
    #[serde(default)]
    pub sorts: SortConditions,
    /// Requested page.
    #[serde(default)]
    pub pagination: Pagination,
    /// Raw filter document, compiled on demand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Free-text search term.
    #[serde(default)]
    pub query: QueryTerm,
    /// Fields to return. Empty means all.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ListSearchArg {
    /// True when the filter holds at least one entry.
    pub fn is_filter_specified(&self) -> bool {
        match &self.filter {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// True when nothing at all was requested.
    pub fn is_zero(&self) -> bool {
        self.sorts.is_empty()
            && self.pagination.is_zero()
            && !self.is_filter_specified()
            && self.query.is_empty()
            && self.fields.is_empty()
    }

    /// Use `per_page` when the request did not ask for a page size.
    pub fn default_per_page(&mut self, per_page: i64) -> &mut Self {
        if self.pagination.per_page <= 0 {
            self.pagination.per_page = per_page;
        }
        self
    }

    /// Parse the embedded filter document. An absent filter gives an empty
    /// tree.
    pub fn filter_tree(&self, mapper: Option<FieldMapper>) -> QueryResult<Tree> {
        let tree = match &self.filter {
            Some(Value::String(text)) if self.is_filter_specified() => Tree::parse_str(text)?,
            Some(doc) if self.is_filter_specified() => Tree::from_value(doc)?,
            _ => Tree::empty(),
        };
        Ok(match mapper {
            Some(mapper) => tree.with_mapper(mapper),
            None => tree,
        })
    }

    /// Add the filter, the search term, sorting and pagination to
    /// `builder`. Logical fields are resolved through `columns` and quoted.
    pub fn apply<B: ClauseBuilder>(
        &self,
        builder: B,
        columns: &HashMap<String, String>,
        max_per_page: i64,
    ) -> QueryResult<B> {
        let mapper = map_quote_field(columns.clone());
        self.apply_with(builder, &mapper, &self.sorts.clause(columns), max_per_page)
    }

    fn apply_with<B: ClauseBuilder>(
        &self,
        builder: B,
        mapper: &FieldMapper,
        order_by: &str,
        max_per_page: i64,
    ) -> QueryResult<B> {
        let tree = self.filter_tree(Some(mapper.clone()))?;
        let term = self.query.to_expression(Some(mapper), &[])?;
        let builder = builder.r#where(tree).r#where(term).order_by(order_by);
        Ok(self.pagination.clone().calculate(max_per_page).apply(builder))
    }
}

/// Arguments of a request that lists rows referencing one parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefSearchArg {
    /// The parent reference every row must match.
    #[serde(default)]
    pub target: EqFilter,
    /// Requested ordering.
    #[serde(default)]
    pub sorts: SortConditions,
    /// Requested page.
    #[serde(default)]
    pub pagination: Pagination,
}

impl RefSearchArg {
    /// True when nothing at all was requested.
    pub fn is_zero(&self) -> bool {
        self.target.is_zero() && self.sorts.is_empty() && self.pagination.is_zero()
    }
}

/// List arguments for template-backed endpoints.
///
/// `fields_map` maps logical fields to column text used verbatim;
/// `select_cols_map` maps them to full select expressions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSearchArg {
    /// Filter, search, sorting and paging parts of the request.
    #[serde(flatten)]
    pub list: ListSearchArg,
    /// Select template; see [`TemplateQuery`].
    #[serde(default)]
    pub select_template: String,
    /// Count template. Blank falls back to `select_template`.
    #[serde(default)]
    pub count_template: String,
    /// Values for `{{name}}` / `{{name_value}}` tokens.
    #[serde(default)]
    pub field_values: FieldValues,
    /// Logical field to column text.
    #[serde(default)]
    pub fields_map: HashMap<String, String>,
    /// Logical field to full select expression.
    #[serde(default)]
    pub select_cols_map: HashMap<String, String>,
}

impl TemplateSearchArg {
    /// Maps a field through `fields_map`, or quotes the logical name.
    pub fn field_mapper(&self) -> FieldMapper {
        let fields_map = self.fields_map.clone();
        Arc::new(move |field: &str| {
            Ok(match fields_map.get(field) {
                Some(column) => column.clone(),
                None => escape_identifier(field),
            })
        })
    }

    /// Select list for the requested fields.
    pub fn fields_to_columns(&self) -> Vec<String> {
        self.list
            .fields
            .iter()
            .map(|f| {
                if let Some(select) = self.select_cols_map.get(f) {
                    select.clone()
                } else if let Some(column) = self.fields_map.get(f) {
                    format!("{} AS {}", column, escape_identifier(f))
                } else {
                    escape_identifier(f)
                }
            })
            .collect()
    }

    /// ORDER BY text for the requested sorts, resolved the same way as
    /// [`TemplateSearchArg::field_mapper`].
    fn order_by(&self) -> String {
        self.list.sorts.clause_with(&|field| {
            Some(match self.fields_map.get(field) {
                Some(column) => column.clone(),
                None => escape_identifier(field),
            })
        })
    }

    /// A template query carrying every part of the request.
    pub fn template_query(&self, max_per_page: i64) -> QueryResult<TemplateQuery> {
        if self.select_template.trim().is_empty() {
            return Err(QueryError::required_field("select_template")
                .with_context("TemplateSearchArg::template_query"));
        }
        let mapper = self.field_mapper();
        let query = TemplateQuery::new(self.select_template.as_str())
            .count_template(self.count_template.as_str())
            .with_mapper(mapper.clone())
            .field_values(self.field_values.clone())
            .columns(self.fields_to_columns());
        self.list
            .apply_with(query, &mapper, &self.order_by(), max_per_page)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataList<T> {
    /// Always true for a built page.
    pub success: bool,
    /// Rows matching the filter across all pages.
    pub total: i64,
    /// Rows in `data`.
    pub data_count: i64,
    /// The page that was served.
    pub pagination: Pagination,
    /// The rows.
    pub data: Vec<T>,
}

impl<T> DataList<T> {
    /// Wrap one page of rows.
    pub fn new(data: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            success: true,
            total,
            data_count: data.len() as i64,
            pagination,
            data,
        }
    }
}

impl<T> Default for DataList<T> {
    fn default() -> Self {
        Self {
            success: true,
            total: 0,
            data_count: 0,
            pagination: Pagination::default(),
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::query::{Query, Selector};
    use crate::types::{Sort, SortOrder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_term_single_column() {
        let term = QueryTerm::new(["name"], "like", "%jo%");
        let (sql, args) = term.to_sql_where(None, &[]).unwrap();
        assert_eq!(sql, "(name LIKE $1)");
        assert_eq!(args, vec![FilterValue::String("%jo%".into())]);
    }

    #[test]
    fn test_query_term_default_columns() {
        let term = QueryTerm::new(Vec::<String>::new(), "not  similar to", "x");
        let defaults = vec!["a".to_string(), "b".to_string()];
        let (sql, args) = term.to_sql_where(None, &defaults).unwrap();
        assert_eq!(sql, "((a NOT SIMILAR TO $1) OR (b NOT SIMILAR TO $2))");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_query_term_regex_and_mapper() {
        let mapper = map_quote_field(HashMap::from([("name".into(), "full_name".into())]));
        let (sql, _) = QueryTerm::new(["name"], "~*", "^a")
            .to_sql_where(Some(&mapper), &[])
            .unwrap();
        assert_eq!(sql, r#"("full_name" ~* $1)"#);

        let err = QueryTerm::new(["age"], "~", "1")
            .to_sql_where(Some(&mapper), &[])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FieldMapping);
    }

    #[test]
    fn test_query_term_invalid_matcher() {
        let err = QueryTerm::new(["a"], "CONTAINS", "x").to_expression(None, &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMatcher);
    }

    #[test]
    fn test_empty_query_term() {
        let term = QueryTerm::new(["a"], "BOGUS", "  ");
        assert!(term.is_empty());
        assert!(term.to_expression(None, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_eq_filter() {
        let (sql, _) = EqFilter::new("parent_id", 3).to_expression(None).unwrap().to_sql().unwrap();
        assert_eq!(sql, "(parent_id = $1)");
        let (sql, args) = EqFilter::new("parent_id", FilterValue::Null)
            .to_expression(None)
            .unwrap()
            .to_sql()
            .unwrap();
        assert_eq!(sql, "(parent_id IS NULL)");
        assert!(args.is_empty());
    }

    #[test]
    fn test_list_search_arg_state() {
        let mut arg = ListSearchArg::default();
        assert!(arg.is_zero());
        assert!(!arg.is_filter_specified());

        arg.filter = Some(serde_json::json!({}));
        assert!(!arg.is_filter_specified());
        arg.filter = Some(serde_json::json!({"a": 1}));
        assert!(arg.is_filter_specified());
        assert!(!arg.is_zero());

        arg.default_per_page(30);
        assert_eq!(arg.pagination.per_page, 30);
        arg.default_per_page(10);
        assert_eq!(arg.pagination.per_page, 30);
    }

    #[test]
    fn test_filter_tree() {
        let arg: ListSearchArg =
            serde_json::from_str(r#"{"filter": {"a": null, "b": {"$in": [1, 2]}}}"#).unwrap();
        let (sql, args) = arg.filter_tree(None).unwrap().to_sql().unwrap();
        assert_eq!(sql, "((a IS NULL) AND (b IN ($1, $2)))");
        assert_eq!(args.len(), 2);

        assert!(ListSearchArg::default().filter_tree(None).unwrap().is_empty());
    }

    #[test]
    fn test_apply_without_filter() {
        let columns = HashMap::from([("id".to_string(), "id".to_string())]);
        let arg = ListSearchArg {
            sorts: SortConditions(vec![Sort::new(["id"], SortOrder::Asc)]),
            ..Default::default()
        };
        let (sql, _) = arg.apply(Query::new().from("t"), &columns, 50).unwrap().select().unwrap();
        assert_eq!(sql, r#"SELECT * FROM t ORDER BY ("id") ASC LIMIT 50"#);
    }

    #[test]
    fn test_ref_search_arg() {
        let arg: RefSearchArg =
            serde_json::from_str(r#"{"target": {"field": "owner", "value": 9}}"#).unwrap();
        assert!(!arg.is_zero());
        assert_eq!(arg.target.value, FilterValue::Int(9));
        assert!(RefSearchArg::default().is_zero());
    }

    #[test]
    fn test_template_search_arg_columns() {
        let arg: TemplateSearchArg = serde_json::from_str(
            r#"{
                "fields": ["id", "name", "total"],
                "fieldsMap": {"name": "u.full_name"},
                "selectColsMap": {"total": "SUM(o.amount) AS total"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            arg.fields_to_columns(),
            vec![
                "\"id\"".to_string(),
                "u.full_name AS \"name\"".to_string(),
                "SUM(o.amount) AS total".to_string(),
            ]
        );
        let mapper = arg.field_mapper();
        assert_eq!(mapper("name").unwrap(), "u.full_name");
        assert_eq!(mapper("id").unwrap(), "\"id\"");
    }

    #[test]
    fn test_template_query_from_arg() {
        let arg: TemplateSearchArg = serde_json::from_str(
            r#"{
                "selectTemplate": "SELECT {{COLUMNS}} FROM users u WHERE {{WHERE}} AND u.org = {{org_value}}{{ORDERBY}}{{LIMIT}}{{OFFSET}}",
                "countTemplate": "SELECT COUNT(*) FROM users u WHERE {{WHERE}} AND u.org = {{org_value}}",
                "fieldValues": {"org": 4},
                "fieldsMap": {"name": "u.name"},
                "fields": ["name"],
                "filter": {"name": {"$like": "a%"}},
                "pagination": {"page": 1, "perPage": 5}
            }"#,
        )
        .unwrap();

        let query = arg.template_query(100).unwrap();
        let (sql, args) = query.select().unwrap();
        assert_eq!(
            sql,
            "SELECT u.name AS \"name\" FROM users u WHERE ((u.name LIKE $2)) AND u.org = $1 LIMIT 5 "
        );
        assert_eq!(args, vec![FilterValue::Int(4), FilterValue::String("a%".into())]);

        let (sql, _) = query.count().unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM users u WHERE ((u.name LIKE $2)) AND u.org = $1");
    }

    #[test]
    fn test_template_order_by_uses_mapped_columns() {
        let arg: TemplateSearchArg = serde_json::from_str(
            r#"{
                "selectTemplate": "SELECT * FROM country AS tc WHERE {{WHERE}}{{ORDERBY}}",
                "fieldsMap": {"name": "tc.name"},
                "filter": {"name": "x"},
                "sorts": [{"fields": ["name", "code"], "order": "desc"}]
            }"#,
        )
        .unwrap();

        let (sql, args) = arg.template_query(100).unwrap().select().unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM country AS tc WHERE ((tc.name = $1)) ORDER BY (tc.name,\"code\") DESC "
        );
        assert_eq!(args, vec![FilterValue::String("x".into())]);
    }

    #[test]
    fn test_template_query_requires_template() {
        let err = TemplateSearchArg::default().template_query(10).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredFieldMissing);
    }

    #[test]
    fn test_data_list() {
        let list = DataList::new(vec![1, 2], 10, Pagination::new(1, 2));
        assert_eq!(list.data_count, 2);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["dataCount"], 2);
        assert_eq!(json["success"], true);
    }
}
