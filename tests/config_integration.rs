//! Integration tests for configuration parsing and handling.
//!
//! These tests verify that configuration files load, validate and drive the
//! statement assemblers.

use std::io::Write;

use pretty_assertions::assert_eq;
use sift::prelude::*;
use sift::query::{ErrorCode, PaginationConfig};

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config = SiftConfig::from_str(
        r#"
        [placeholder]
        style = "question_mark"
        start = 1

        [pagination]
        max_per_page = 200
        default_per_page = 20

        [debug]
        log_sql = true
    "#,
    )
    .unwrap();

    assert_eq!(config.placeholder.style, PlaceholderStyle::QuestionMark);
    assert_eq!(
        config.pagination,
        PaginationConfig {
            max_per_page: 200,
            default_per_page: 20,
        }
    );
    assert!(config.debug.log_sql);
}

/// Test loading from a file
#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[pagination]\nmax_per_page = 60").unwrap();

    let config = SiftConfig::from_file(file.path()).unwrap();
    assert_eq!(config.pagination.max_per_page, 60);
    assert_eq!(config.pagination.default_per_page, 25);
}

/// Test invalid configurations are rejected
#[test]
fn test_config_invalid() {
    for text in [
        "[placeholder]\nstyle = \"colon\"",
        "[placeholder]\nstart = -2",
        "[pagination]\nmax_per_page = 0",
        "[cache]\nsize = 1",
        "not toml at all",
    ] {
        let err = SiftConfig::from_str(text).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration, "{text:?}");
        assert!(err.is_config_error());
    }
}

/// Test page limits from configuration
#[test]
fn test_config_pagination() {
    let config = SiftConfig::from_str("[pagination]\nmax_per_page = 50\ndefault_per_page = 10").unwrap();

    let page = Pagination::new(2, 0).calculate_with(&config.pagination);
    assert_eq!((page.limit(), page.offset()), (10, 10));

    let page = Pagination::new(1, 75).calculate_with(&config.pagination);
    let (sql, _) = page
        .apply(Query::new().from("t").with_config(&config))
        .select()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t LIMIT 50");
}

/// Test the question-mark style applies to template queries
#[test]
fn test_config_template_style() {
    let config = SiftConfig::from_str("[placeholder]\nstyle = \"question_mark\"").unwrap();
    let (sql, _) = TemplateQuery::new("SELECT * FROM t WHERE {{WHERE}}")
        .r#where(Expr::between("a", 1, 9))
        .with_config(&config)
        .select()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE (a BETWEEN ? AND ?)");
}
