//! Error types for filter compilation and statement assembly.
//!
//! Every failure carries an [`ErrorCode`] for programmatic handling plus an
//! optional [`ErrorContext`] describing where it happened.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Filter errors (malformed document, unknown operator, mapping)
//! - 2xxx: Template errors
//! - 3xxx: Consistency errors (placeholder/argument drift)
//! - 4xxx: Argument errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use sift_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::unknown_operator("$foo");
//! assert_eq!(err.code, ErrorCode::UnknownOperator);
//! assert_eq!(err.code.code(), "S1002");
//! assert!(err.to_string().contains("$foo"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query building operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filter errors (1xxx)
    /// Filter document is not valid JSON or violates the grammar (S1001).
    MalformedFilter = 1001,
    /// A `$`-prefixed key is not a known operator (S1002).
    UnknownOperator = 1002,
    /// The field mapper rejected a logical field name (S1003).
    FieldMapping = 1003,
    /// Search matcher keyword is not recognised (S1004).
    InvalidMatcher = 1004,
    /// A required statement part was not supplied (S1005).
    RequiredFieldMissing = 1005,

    // Template errors (2xxx)
    /// Template skeleton is invalid (S2001).
    MalformedTemplate = 2001,

    // Consistency errors (3xxx)
    /// Placeholder count and argument count disagree (S3001).
    Consistency = 3001,

    // Argument errors (4xxx)
    /// An argument passed to a builder is invalid (S4001).
    InvalidArgument = 4001,

    // Configuration errors (7xxx)
    /// Invalid configuration (S7001).
    InvalidConfiguration = 7001,
    /// Configuration file could not be read (S7002).
    ConfigurationIo = 7002,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MalformedFilter => "Malformed filter document",
            Self::UnknownOperator => "Unknown filter operator",
            Self::FieldMapping => "Field mapping failed",
            Self::InvalidMatcher => "Invalid search matcher",
            Self::RequiredFieldMissing => "Required field missing",
            Self::MalformedTemplate => "Malformed query template",
            Self::Consistency => "Placeholder and argument count mismatch",
            Self::InvalidArgument => "Invalid argument",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::ConfigurationIo => "Configuration file unreadable",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The logical field involved.
    pub field: Option<String>,
    /// The SQL rendered so far (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while compiling filters or assembling statements.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL rendered so far.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a malformed filter error.
    pub fn malformed_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedFilter, message)
            .with_help("Filters are JSON objects keyed by field name or `$` operator")
    }

    /// Create an unknown operator error.
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        let operator = operator.into();
        Self::new(
            ErrorCode::UnknownOperator,
            format!("Unknown filter operator `{}`", operator),
        )
        .with_suggestion("Use one of $and, $or, $not, $eq, $neq, $gt, $gte, $lt, $lte, $in, $nin, $like, $between, ...")
    }

    /// Create a field mapping error.
    pub fn field_mapping(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::FieldMapping,
            format!("Cannot map field `{}`: {}", field, reason.into()),
        )
        .with_field(field)
    }

    /// Create an invalid matcher error.
    pub fn invalid_matcher(matcher: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidMatcher,
            format!("Valid matcher keyword not found in `{}`", matcher.into()),
        )
        .with_suggestion("Use LIKE, NOT LIKE, ILIKE, SIMILAR TO, NOT SIMILAR TO, ~, ~*, !~ or !~*")
    }

    /// Create a required field missing error.
    pub fn required_field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::RequiredFieldMissing,
            format!("Required part `{}` was not provided", name),
        )
        .with_field(name)
    }

    /// Create a malformed template error.
    pub fn malformed_template(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedTemplate, message)
            .with_help("Templates must start with SELECT or WITH")
    }

    /// Create a placeholder/argument consistency error.
    pub fn consistency(placeholders: usize, args: usize) -> Self {
        Self::new(
            ErrorCode::Consistency,
            format!(
                "Placeholder count ({}) does not match argument count ({})",
                placeholders, args
            ),
        )
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    // ============== Error Type Checks ==============

    /// Check if this is a filter error (malformed, unknown operator or mapping).
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::MalformedFilter | ErrorCode::UnknownOperator | ErrorCode::FieldMapping
        )
    }

    /// Check if this is a template error.
    pub fn is_template_error(&self) -> bool {
        self.code == ErrorCode::MalformedTemplate
    }

    /// Check if this is a placeholder/argument mismatch.
    pub fn is_consistency_error(&self) -> bool {
        self.code == ErrorCode::Consistency
    }

    /// Check if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidConfiguration | ErrorCode::ConfigurationIo
        )
    }

    /// Display the error with all of its context, one item per line.
    pub fn display_full(&self) -> String {
        let mut output = format!("Error [{}]: {}", self.code.code(), self.message);

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("\n  Operation: {}", op));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("\n  Field: {}", field));
        }
        if let Some(ref sql) = self.context.sql {
            output.push_str(&format!("\n  SQL: {}", sql));
        }
        for suggestion in &self.context.suggestions {
            output.push_str(&format!("\n  Suggestion: {}", suggestion));
        }
        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\n  Help: {}", help));
        }

        output
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::malformed_filter(format!("Invalid filter JSON: {}", err)).with_source(err)
    }
}

/// Build a [`QueryError`] with optional `with_*` calls chained on.
///
/// ```rust
/// use sift_query::{query_error, ErrorCode};
///
/// let err = query_error!(ErrorCode::InvalidArgument, "bad", with_field = "age");
/// assert_eq!(err.context.field.as_deref(), Some("age"));
/// ```
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
