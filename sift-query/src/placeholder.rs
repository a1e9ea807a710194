//! Bind-parameter placeholder generators.
//!
//! A generator hands out placeholder tokens in order and remembers how many
//! it has produced, so an assembler can compare the count against the number
//! of bound arguments once rendering is finished.
//!
//! ```rust
//! use sift_query::{NumberedPlaceholder, Placeholder};
//!
//! let mut ph = NumberedPlaceholder::new();
//! assert_eq!(ph.next(), "$1");
//! assert_eq!(ph.next(), "$2");
//! assert_eq!(ph.position(), 2);
//! ```

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// The token family a generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// PostgreSQL style: `$1`, `$2`, ...
    #[default]
    Numbered,
    /// MySQL/SQLite style: `?` for every parameter.
    QuestionMark,
}

impl PlaceholderStyle {
    /// Get the token for the given 1-based parameter index.
    pub fn token(&self, index: usize) -> Cow<'static, str> {
        match self {
            Self::Numbered => Cow::Owned(format!("${}", index)),
            Self::QuestionMark => Cow::Borrowed("?"),
        }
    }

    /// Create a fresh generator of this style whose first token is `start`.
    ///
    /// `start` only affects numbered placeholders.
    pub fn generator(&self, start: i64) -> QueryResult<Box<dyn Placeholder>> {
        Ok(match self {
            Self::Numbered => Box::new(NumberedPlaceholder::starting_at(start)?),
            Self::QuestionMark => Box::new(QuestionMarkPlaceholder::new()),
        })
    }

    /// Parse a style name (`numbered`/`question_mark`, also `$`/`?`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "numbered" | "dollar" | "$" => Some(Self::Numbered),
            "question_mark" | "questionmark" | "?" => Some(Self::QuestionMark),
            _ => None,
        }
    }
}

impl fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numbered => f.write_str("numbered"),
            Self::QuestionMark => f.write_str("question_mark"),
        }
    }
}

/// A stateful source of placeholder tokens.
pub trait Placeholder {
    /// Produce the next token and advance the position.
    fn next(&mut self) -> Cow<'static, str>;

    /// Number of tokens consumed since construction (plus any start offset).
    fn position(&self) -> usize;

    /// The token family of this generator.
    fn style(&self) -> PlaceholderStyle;

    /// Advance the position by `n` without producing tokens.
    ///
    /// Used when pre-rendered text that already contains `n` tokens is
    /// replayed into a statement.
    fn advance_by(&mut self, n: usize);
}

/// Numbered generator producing `$1`, `$2`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedPlaceholder {
    pos: usize,
}

impl NumberedPlaceholder {
    /// Create a generator whose first token is `$1`.
    pub fn new() -> Self {
        Self { pos: 0 }
    }

    /// Create a generator whose first token is `$start`.
    ///
    /// Fails when `start` would put the initial position below zero.
    pub fn starting_at(start: i64) -> QueryResult<Self> {
        let pos = start - 1;
        if pos < 0 {
            return Err(QueryError::invalid_argument(format!(
                "Numbered placeholders must start at 1 or later, got {}",
                start
            )));
        }
        Ok(Self { pos: pos as usize })
    }
}

impl Default for NumberedPlaceholder {
    fn default() -> Self {
        Self::new()
    }
}

impl Placeholder for NumberedPlaceholder {
    fn next(&mut self) -> Cow<'static, str> {
        self.pos += 1;
        PlaceholderStyle::Numbered.token(self.pos)
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn advance_by(&mut self, n: usize) {
        self.pos += n;
    }
}

/// Generator producing `?` for every parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionMarkPlaceholder {
    pos: usize,
}

impl QuestionMarkPlaceholder {
    /// Create a new generator.
    pub fn new() -> Self {
        Self { pos: 0 }
    }
}

impl Placeholder for QuestionMarkPlaceholder {
    fn next(&mut self) -> Cow<'static, str> {
        self.pos += 1;
        Cow::Borrowed("?")
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn advance_by(&mut self, n: usize) {
        self.pos += n;
    }
}
