//! Logical field to database column helpers.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::sql::escape_identifier;
use crate::tree::FieldMapper;

/// A mapper that quotes the column mapped to each logical field and rejects
/// fields missing from `columns`.
///
/// ```rust
/// use std::collections::HashMap;
/// use sift_query::mapping::map_quote_field;
///
/// let mapper = map_quote_field(HashMap::from([("name".into(), "full_name".into())]));
/// assert_eq!(mapper("name").unwrap(), r#""full_name""#);
/// assert!(mapper("age").is_err());
/// ```
pub fn map_quote_field(columns: HashMap<String, String>) -> FieldMapper {
    Arc::new(move |field: &str| match columns.get(field) {
        Some(column) => Ok(escape_identifier(column)),
        None => Err(QueryError::field_mapping(field, "no column is mapped to this field")
            .with_suggestion(format!("Known fields: {}", known_fields(&columns)))),
    })
}

fn known_fields(columns: &HashMap<String, String>) -> String {
    let mut names: Vec<&str> = columns.keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

/// Quoted, comma-joined select list for `fields`, plus the fields that have
/// no mapping.
pub fn quote_select_fields(
    fields: &[String],
    columns: &HashMap<String, String>,
) -> (String, Vec<String>) {
    let mut quoted = Vec::with_capacity(fields.len());
    let mut unknown = Vec::new();
    for field in fields {
        match columns.get(field) {
            Some(column) => quoted.push(escape_identifier(column)),
            None => unknown.push(field.clone()),
        }
    }
    (quoted.join(", "), unknown)
}

/// How a JSON field is selected and what the result column is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectColumn {
    pub json_field: String,
    pub select_field: String,
    #[serde(default)]
    pub result_field: String,
}

impl SelectColumn {
    pub fn new(
        json_field: impl Into<String>,
        select_field: impl Into<String>,
        result_field: impl Into<String>,
    ) -> Self {
        Self {
            json_field: json_field.into(),
            select_field: select_field.into(),
            result_field: result_field.into(),
        }
    }

    /// `select_field AS "result_field"`, or the bare select field when no
    /// result name is set.
    pub fn to_sql(&self) -> String {
        if self.result_field.is_empty() {
            self.select_field.clone()
        } else {
            format!("{} AS {}", self.select_field, escape_identifier(&self.result_field))
        }
    }
}

/// Select list for `columns`, joined with `, `.
pub fn join_select_columns(columns: &[SelectColumn]) -> String {
    columns
        .iter()
        .filter(|c| !c.select_field.is_empty())
        .map(SelectColumn::to_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result column for a JSON field, matched case-insensitively. Falls back to
/// the JSON field name when the column has no result name.
pub fn find_result_field<'a>(columns: &'a [SelectColumn], json_field: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.json_field.eq_ignore_ascii_case(json_field))
        .map(|c| {
            if c.result_field.is_empty() {
                c.json_field.as_str()
            } else {
                c.result_field.as_str()
            }
        })
}
