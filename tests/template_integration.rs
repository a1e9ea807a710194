//! Integration tests for template-based statements.
//!
//! These tests verify token substitution order, placeholder numbering across
//! field values and conditions, and the search-request path into templates.

use pretty_assertions::assert_eq;
use sift::prelude::*;
use sift::query::{NumberedPlaceholder, TemplateSearchArg};

const SELECT_TEMPLATE: &str = "SELECT DISTINCT {{COLUMNS}} FROM country AS tc \
     LEFT JOIN district AS td ON tc.id = td.id \
     WHERE {{WHERE}} AND {{idField}} IN {{idField_value}}{{GROUPBY}}{{ORDERBY}}{{LIMIT}}{{OFFSET}}";

const COUNT_TEMPLATE: &str = "SELECT COUNT(*) FROM country WHERE {{WHERE}}";

const FILTER: &str = r#"{
    "$or": [
        {"field": 10},
        {"item": {"$gt": 300}},
        {"value": {"$in": [100, 200]}},
        {"age": {"$between": [20, 30]}},
        {"empty": ""}
    ]
}"#;

fn search_arg() -> TemplateSearchArg {
    let mut arg: TemplateSearchArg = serde_json::from_str(
        r#"{
            "pagination": {"page": 1, "perPage": 40},
            "fields": ["age", "itemValue", "item"],
            "fieldValues": {"idField": ["one", "two", "", "%"]},
            "fieldsMap": {"age": "data->>'age'", "item": "custom_item"},
            "selectColsMap": {"age": "data->>'age' AS age"}
        }"#,
    )
    .unwrap();
    arg.list.filter = Some(serde_json::from_str(FILTER).unwrap());
    arg.select_template = SELECT_TEMPLATE.to_string();
    arg.count_template = COUNT_TEMPLATE.to_string();
    arg
}

/// Test the country/district template built by hand from a search request
#[test]
fn test_country_template() {
    let arg = search_arg();
    let tree = arg.list.filter_tree(Some(arg.field_mapper())).unwrap();

    let query = TemplateQuery::new(SELECT_TEMPLATE)
        .count_template(COUNT_TEMPLATE)
        .with_mapper(arg.field_mapper())
        .field_values(arg.field_values.clone())
        .columns(arg.fields_to_columns())
        .r#where(tree)
        .limit(10)
        .offset(3);

    let expected = "SELECT DISTINCT data->>'age' AS age, \"itemValue\", custom_item AS \"item\" \
        FROM country AS tc LEFT JOIN district AS td ON tc.id = td.id \
        WHERE (((\"field\" = $5) OR (custom_item > $6) OR (\"value\" IN ($7, $8)) \
        OR (data->>'age' BETWEEN $9 AND $10) OR (\"empty\" = $11))) \
        AND \"idField\" IN ($1, $2, $3, $4) LIMIT 10  OFFSET 3 ";

    let mut ph = NumberedPlaceholder::new();
    let mut sb = String::new();
    let built_args = query.build(&mut sb, &mut ph).unwrap();
    assert_eq!(sb, expected);
    assert_eq!(ph.position(), 11);

    let (select, args) = query.select().unwrap();
    assert_eq!(select, expected);
    assert_eq!(args, built_args);
    assert_eq!(
        &args[..4],
        &[
            FilterValue::String("one".into()),
            FilterValue::String("two".into()),
            FilterValue::String(String::new()),
            FilterValue::String("%".into()),
        ]
    );

    let (count, count_args) = query.count().unwrap();
    assert_eq!(
        count,
        "SELECT COUNT(*) FROM country WHERE (((\"field\" = $1) OR (custom_item > $2) \
         OR (\"value\" IN ($3, $4)) OR (data->>'age' BETWEEN $5 AND $6) OR (\"empty\" = $7)))"
    );
    assert_eq!(count_args.len(), 7);
}

/// Test the same request through `TemplateSearchArg::template_query`
#[test]
fn test_template_search_arg() {
    let query = search_arg().template_query(100).unwrap();
    let (select, args) = query.select().unwrap();
    assert!(select.ends_with("AND \"idField\" IN ($1, $2, $3, $4) LIMIT 40 "));
    assert_eq!(args.len(), 11);
}

/// Test question-mark templates with bindings in textual order
#[test]
fn test_question_mark_template() {
    let (sql, args) = TemplateQuery::new(
        "WITH recent AS (SELECT * FROM orders WHERE shop = {{shop_value}}) \
         SELECT {{COLUMNS}} FROM recent WHERE {{WHERE}}{{GROUPBY}}HAVING {{HAVING}}",
    )
    .field_value("shop", 12)
    .columns(["customer", "COUNT(*)"])
    .r#where(Expr::gt("total", 50))
    .group_by("customer")
    .having(Expr::raw("COUNT(*) >= ?", [3]))
    .placeholder_style(PlaceholderStyle::QuestionMark)
    .select()
    .unwrap();

    assert_eq!(
        sql,
        "WITH recent AS (SELECT * FROM orders WHERE shop = ?) \
         SELECT customer, COUNT(*) FROM recent WHERE (total > ?) GROUP BY customer HAVING (COUNT(*) >= ?)"
    );
    assert_eq!(
        args,
        vec![FilterValue::Int(12), FilterValue::Int(50), FilterValue::Int(3)]
    );
}

/// Test template errors
#[test]
fn test_template_errors() {
    let err = TemplateQuery::new("UPDATE t SET a = 1").select().unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedTemplate);
    assert!(err.is_template_error());

    let err = TemplateQuery::new("SELECT * FROM t")
        .having(Expr::gt("n", 1))
        .select()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedTemplate);

    let err = TemplateQuery::new("SELECT * FROM t WHERE {{WHERE}} {{SORT}}")
        .select()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedTemplate);
}
