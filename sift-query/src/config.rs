//! Configuration loaded from `sift.toml`.
//!
//! ```toml
//! [placeholder]
//! style = "numbered"   # or "question_mark"
//! start = 1
//!
//! [pagination]
//! max_per_page = 500
//! default_per_page = 25
//!
//! [debug]
//! log_sql = false
//! ```
//!
//! `${VAR}` references are replaced with the environment value before the
//! text is parsed; unknown variables are left untouched.

use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::placeholder::PlaceholderStyle;

/// Overrides the placeholder style.
pub const ENV_PLACEHOLDER_STYLE: &str = "SIFT_PLACEHOLDER_STYLE";
/// Overrides `pagination.max_per_page`.
pub const ENV_MAX_PER_PAGE: &str = "SIFT_MAX_PER_PAGE";
/// Overrides `pagination.default_per_page`.
pub const ENV_DEFAULT_PER_PAGE: &str = "SIFT_DEFAULT_PER_PAGE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    /// Placeholder settings for standalone renders.
    #[serde(default)]
    pub placeholder: PlaceholderConfig,

    /// Page size limits.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,
}

impl SiftConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::new(
                ErrorCode::ConfigurationIo,
                format!("Failed to read {}", path.display()),
            )
            .with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded).map_err(|e| {
            QueryError::invalid_configuration("Failed to parse configuration").with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SIFT_*` environment overrides.
    pub fn with_env_overrides(self) -> QueryResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> QueryResult<Self> {
        if let Some(style) = lookup(ENV_PLACEHOLDER_STYLE) {
            self.placeholder.style = PlaceholderStyle::parse(&style).ok_or_else(|| {
                QueryError::invalid_configuration(format!(
                    "{} has unknown placeholder style '{}'",
                    ENV_PLACEHOLDER_STYLE, style
                ))
                .with_help("Use 'numbered' or 'question_mark'")
            })?;
        }
        if let Some(n) = parse_i64(ENV_MAX_PER_PAGE, lookup(ENV_MAX_PER_PAGE))? {
            self.pagination.max_per_page = n;
        }
        if let Some(n) = parse_i64(ENV_DEFAULT_PER_PAGE, lookup(ENV_DEFAULT_PER_PAGE))? {
            self.pagination.default_per_page = n;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings no renderer can honor.
    pub fn validate(&self) -> QueryResult<()> {
        if self.placeholder.start < 1 {
            return Err(QueryError::invalid_configuration(format!(
                "placeholder.start must be at least 1, got {}",
                self.placeholder.start
            )));
        }
        if self.pagination.max_per_page <= 0 {
            return Err(QueryError::invalid_configuration(
                "pagination.max_per_page must be greater than 0",
            ));
        }
        if self.pagination.default_per_page <= 0 {
            return Err(QueryError::invalid_configuration(
                "pagination.default_per_page must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Placeholder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceholderConfig {
    #[serde(default)]
    pub style: PlaceholderStyle,

    /// Number of the first placeholder.
    #[serde(default = "default_start")]
    pub start: i64,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            style: PlaceholderStyle::default(),
            start: default_start(),
        }
    }
}

/// Page size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    /// Hard cap on page size.
    #[serde(default = "default_max_per_page")]
    pub max_per_page: i64,

    /// Page size used when a request does not give one.
    #[serde(default = "default_per_page")]
    pub default_per_page: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_per_page: default_max_per_page(),
            default_per_page: default_per_page(),
        }
    }
}

/// Debug settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Include the full SQL text in statement logs.
    #[serde(default)]
    pub log_sql: bool,
}

fn default_start() -> i64 {
    1
}

fn default_max_per_page() -> i64 {
    500
}

fn default_per_page() -> i64 {
    25
}

fn parse_i64(name: &str, raw: Option<String>) -> QueryResult<Option<i64>> {
    match raw {
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            QueryError::invalid_configuration(format!("{} is not an integer: '{}'", name, raw))
                .with_source(e)
        }),
        None => Ok(None),
    }
}

static ENV_VAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").ok());

fn expand_env_vars(content: &str) -> String {
    let Some(re) = ENV_VAR.as_ref() else {
        return content.to_string();
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = SiftConfig::default();
        assert_eq!(config.placeholder.style, PlaceholderStyle::Numbered);
        assert_eq!(config.placeholder.start, 1);
        assert_eq!(config.pagination.max_per_page, 500);
        assert_eq!(config.pagination.default_per_page, 25);
        assert!(!config.debug.log_sql);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [placeholder]
            style = "question_mark"

            [pagination]
            max_per_page = 100

            [debug]
            log_sql = true
        "#;

        let config = SiftConfig::from_str(toml).unwrap();
        assert_eq!(config.placeholder.style, PlaceholderStyle::QuestionMark);
        assert_eq!(config.placeholder.start, 1);
        assert_eq!(config.pagination.max_per_page, 100);
        assert_eq!(config.pagination.default_per_page, 25);
        assert!(config.debug.log_sql);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(SiftConfig::from_str("").unwrap(), SiftConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SiftConfig::from_str("[pagination]\nmax = 3").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(err.source.is_some());
    }

    #[test]
    fn test_validation() {
        let err = SiftConfig::from_str("[placeholder]\nstart = 0").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        let err = SiftConfig::from_str("[pagination]\ndefault_per_page = 0").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_missing_file() {
        let err = SiftConfig::from_file("/definitely/not/here/sift.toml").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigurationIo);
        assert!(err.is_config_error());
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("SIFT_TEST_PAGE_CAP", "42");
        }
        let expanded = expand_env_vars("max_per_page = ${SIFT_TEST_PAGE_CAP}");
        assert_eq!(expanded, "max_per_page = 42");
        assert_eq!(expand_env_vars("x = \"${SIFT_TEST_UNSET_VAR}\""), "x = \"${SIFT_TEST_UNSET_VAR}\"");
        unsafe {
            std::env::remove_var("SIFT_TEST_PAGE_CAP");
        }
    }

    fn overrides<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_overrides() {
        let config = SiftConfig::default()
            .with_overrides(overrides(&[
                (ENV_PLACEHOLDER_STYLE, "question_mark"),
                (ENV_MAX_PER_PAGE, " 80 "),
                (ENV_DEFAULT_PER_PAGE, "20"),
            ]))
            .unwrap();
        assert_eq!(config.placeholder.style, PlaceholderStyle::QuestionMark);
        assert_eq!(config.pagination.max_per_page, 80);
        assert_eq!(config.pagination.default_per_page, 20);

        let untouched = SiftConfig::default().with_overrides(overrides(&[])).unwrap();
        assert_eq!(untouched, SiftConfig::default());
    }

    #[test]
    fn test_overrides_rejected() {
        let err = SiftConfig::default()
            .with_overrides(overrides(&[(ENV_PLACEHOLDER_STYLE, "colon")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(err.context.help.is_some());

        let err = SiftConfig::default()
            .with_overrides(overrides(&[(ENV_MAX_PER_PAGE, "lots")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(err.source.is_some());

        let err = SiftConfig::default()
            .with_overrides(overrides(&[(ENV_DEFAULT_PER_PAGE, "0")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: no other test in this crate touches this variable
        unsafe {
            std::env::set_var(ENV_PLACEHOLDER_STYLE, "question_mark");
        }
        let result = SiftConfig::default().with_env_overrides();
        unsafe {
            std::env::remove_var(ENV_PLACEHOLDER_STYLE);
        }
        assert_eq!(result.unwrap().placeholder.style, PlaceholderStyle::QuestionMark);
    }
}
