//! Benchmarks for statement assembly.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use sift::prelude::*;
use sift::query::FieldValues;

/// Benchmark `Query` assembly.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_select");

    group.bench_function("select_star", |b| {
        let query = Query::new().from("users");
        b.iter(|| black_box(query.select()))
    });

    group.bench_function("select_with_expressions", |b| {
        let query = Query::new()
            .from("users")
            .columns(["id", "email", "name"])
            .r#where(Expr::eq("status", "active"))
            .r#where(Expr::between("age", 18, 65))
            .r#where(Expr::is_in("role", vec!["admin", "editor", "viewer"]))
            .order_by("created_at DESC")
            .limit(20)
            .offset(40);
        b.iter(|| black_box(query.select()))
    });

    group.bench_function("select_with_tree", |b| {
        let tree = Arc::new(
            Tree::parse_str(r#"{"status": "A", "$or": [{"qty": {"$lt": 30}}, {"item": {"$like": "p%"}}]}"#)
                .unwrap(),
        );
        let query = Query::new().from("inventory").r#where(tree).limit(10);
        b.iter(|| black_box(query.select()))
    });

    group.bench_function("count_with_tree", |b| {
        let tree = Tree::parse_str(r#"{"age": {"$gte": 21}}"#).unwrap();
        let query = Query::new().from("people").r#where(tree).order_by("age");
        b.iter(|| black_box(query.count()))
    });

    group.finish();
}

/// Benchmark `TemplateQuery` substitution.
fn bench_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_select");

    for ids in [4, 64] {
        let mut values = FieldValues::new();
        values.insert(
            "id".to_string(),
            FilterValue::List((0..ids).map(FilterValue::Int).collect()),
        );
        let query = TemplateQuery::new(
            "SELECT {{COLUMNS}} FROM t WHERE {{WHERE}} AND {{id}} IN {{id_value}}{{ORDERBY}}{{LIMIT}}",
        )
        .field_values(values)
        .columns(["a", "b"])
        .r#where(Expr::eq("kind", "x"))
        .order_by("a")
        .limit(10);

        group.bench_with_input(BenchmarkId::new("list_value", ids), &query, |b, query| {
            b.iter(|| black_box(query.select()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_query, bench_template);
criterion_main!(benches);
