//! Sorting requests and their ORDER BY text.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::sql::escape_identifier;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// `desc` in any case is descending; anything else is ascending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl From<&str> for SortOrder {
    fn from(s: &str) -> Self {
        Self::parse_lenient(s)
    }
}

impl From<String> for SortOrder {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl Serialize for SortOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_sql())
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&s))
    }
}

/// One sort request: a set of logical fields sharing an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub order: SortOrder,
}

impl Sort {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>, order: SortOrder) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            order,
        }
    }

    /// ORDER BY text for the fields present in `columns` (logical name to
    /// database column), e.g. `("a","b") DESC`. Unknown fields are skipped;
    /// the result is empty when none is known.
    pub fn clause(&self, columns: &HashMap<String, String>) -> String {
        self.clause_with(&|f| columns.get(f).map(|c| escape_identifier(c)))
    }

    /// ORDER BY text with each field resolved to its final SQL text by
    /// `resolve`. Fields it returns `None` for are skipped.
    pub fn clause_with(&self, resolve: &dyn Fn(&str) -> Option<String>) -> String {
        let mapped: Vec<String> = self.fields.iter().filter_map(|f| resolve(f)).collect();
        if mapped.is_empty() {
            return String::new();
        }
        format!("({}) {}", mapped.join(","), self.order)
    }
}

/// Several sort requests, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortConditions(pub Vec<Sort>);

impl SortConditions {
    /// True when no sort was requested.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty [`Sort::clause`] texts joined with `,`.
    pub fn clause(&self, columns: &HashMap<String, String>) -> String {
        self.clause_with(&|f| columns.get(f).map(|c| escape_identifier(c)))
    }

    /// Non-empty [`Sort::clause_with`] texts joined with `,`.
    pub fn clause_with(&self, resolve: &dyn Fn(&str) -> Option<String>) -> String {
        self.0
            .iter()
            .map(|s| s.clause_with(resolve))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<Vec<Sort>> for SortConditions {
    fn from(sorts: Vec<Sort>) -> Self {
        Self(sorts)
    }
}
