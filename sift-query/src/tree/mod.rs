//! JSON filter documents compiled into parameterized SQL conditions.
//!
//! A filter document is a JSON object whose keys are logical field names or
//! `$` operators:
//!
//! ```json
//! {
//!   "status": "A",
//!   "$or": [{ "qty": { "$lt": 30 } }, { "item": { "$like": "p%" } }],
//!   "age": { "$between": [20, 30] }
//! }
//! ```
//!
//! Entries of an object must all hold; elements of an array are alternatives.
//! Parsing only checks structure. Operators are resolved, and field names
//! mapped to columns, when the tree is rendered.
//!
//! ```rust
//! use sift_query::{Render, Tree};
//!
//! let tree = Tree::parse(br#"{"age": {"$between": [20, 30]}}"#)
//!     .unwrap()
//!     .with_field_mapper(|field| Ok(format!("\"{}\"", field)));
//! let (sql, args) = tree.to_sql().unwrap();
//! assert_eq!(sql, r#"(("age" BETWEEN $1 AND $2))"#);
//! assert_eq!(args.len(), 2);
//! ```

mod node;

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::trace;

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::expr::{Expression, Render};
use crate::filter::FilterValue;
use crate::placeholder::{Placeholder, PlaceholderStyle};

use node::{Compiler, TreeNode};

/// Maps a logical field name to the SQL text of its column.
pub type FieldMapper = Arc<dyn Fn(&str) -> QueryResult<String> + Send + Sync>;

/// A parsed filter document.
#[derive(Clone)]
pub struct Tree {
    key: String,
    root: Option<TreeNode>,
    mapper: Option<FieldMapper>,
    compiled: OnceLock<CompiledFilter>,
}

impl Tree {
    /// Root key used when none is given.
    pub const DEFAULT_KEY: &'static str = "filter";

    /// Parse a filter document. Empty input yields an empty tree.
    pub fn parse(data: &[u8]) -> QueryResult<Self> {
        Self::parse_with_key(data, Self::DEFAULT_KEY)
    }

    /// Parse a filter document whose root node is named `key`.
    pub fn parse_with_key(data: &[u8], key: &str) -> QueryResult<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty_with_key(key));
        }
        let doc: Value = serde_json::from_slice(data)?;
        Self::from_value_with_key(&doc, key)
    }

    /// Parse a filter document from a string.
    pub fn parse_str(data: &str) -> QueryResult<Self> {
        Self::parse(data.as_bytes())
    }

    /// Build a tree from an already decoded JSON value. `null` yields an
    /// empty tree.
    pub fn from_value(doc: &Value) -> QueryResult<Self> {
        Self::from_value_with_key(doc, Self::DEFAULT_KEY)
    }

    fn from_value_with_key(doc: &Value, key: &str) -> QueryResult<Self> {
        if doc.is_null() {
            return Ok(Self::empty_with_key(key));
        }
        let root = node::parse_document(key, doc)?;
        trace!(key = key, children = root.children.len(), "Tree::parse()");
        Ok(Self {
            key: key.to_string(),
            root: Some(root),
            mapper: None,
            compiled: OnceLock::new(),
        })
    }

    /// An empty tree.
    pub fn empty() -> Self {
        Self::empty_with_key(Self::DEFAULT_KEY)
    }

    fn empty_with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            root: None,
            mapper: None,
            compiled: OnceLock::new(),
        }
    }

    /// Set the field mapper applied to every field name at render time.
    pub fn with_field_mapper<F>(self, mapper: F) -> Self
    where
        F: Fn(&str) -> QueryResult<String> + Send + Sync + 'static,
    {
        self.with_mapper(Arc::new(mapper))
    }

    /// Set a shared field mapper.
    pub fn with_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = Some(mapper);
        self.compiled = OnceLock::new();
        self
    }

    /// The root key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The result of the first successful render, if any.
    pub fn compiled(&self) -> Option<&CompiledFilter> {
        self.compiled.get()
    }

    /// Walk the tree with `ph` without touching the cache.
    pub fn compile(&self, ph: &mut dyn Placeholder) -> QueryResult<CompiledFilter> {
        let start = ph.position();
        let style = ph.style();
        let walk = match self.root.as_ref() {
            Some(root) => Compiler::new(self.mapper.as_ref(), ph).run(root)?,
            None => Default::default(),
        };
        trace!(
            start = start,
            args = walk.args.len(),
            fields = walk.fields.len(),
            "Tree::compile()"
        );
        Ok(CompiledFilter {
            clause: walk.clause,
            args: walk.args,
            fields: walk.fields,
            sql_fields: walk.sql_fields,
            start,
            style,
        })
    }
}

impl Render for Tree {
    /// Render the tree, reusing the cached result when `ph` is in the same
    /// state as when it was produced.
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(cached) = self.compiled.get() {
            if cached.matches(ph) {
                trace!(start = cached.start, "Tree cache hit");
                return cached.render(sb, ph);
            }
            crate::sift_debug!(
                cached_start = cached.start,
                position = ph.position(),
                "Tree cache bypassed, recompiling"
            );
        }

        let compiled = self.compile(ph)?;
        sb.push_str(&compiled.clause);
        let args = compiled.args.clone();
        // only the first render is kept
        let _ = self.compiled.set(compiled);
        Ok(args)
    }

    fn is_empty(&self) -> bool {
        self.root.as_ref().is_none_or(TreeNode::is_empty)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("key", &self.key)
            .field("root", &self.root)
            .field("has_mapper", &self.mapper.is_some())
            .field("compiled", &self.compiled.get())
            .finish()
    }
}

impl From<Tree> for Expression {
    fn from(tree: Tree) -> Self {
        Expression::nested(tree)
    }
}

impl From<Arc<Tree>> for Expression {
    fn from(tree: Arc<Tree>) -> Self {
        Expression::Nested(tree)
    }
}

/// The rendered form of a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    /// The SQL condition text.
    pub clause: String,
    /// Bound values in placeholder order.
    pub args: Vec<FilterValue>,
    /// Logical field names, one per field reference.
    pub fields: Vec<String>,
    /// Mapped column text, parallel to `fields`.
    pub sql_fields: Vec<String>,
    start: usize,
    style: PlaceholderStyle,
}

impl CompiledFilter {
    /// Placeholder position the clause was rendered from.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Placeholder style the clause was rendered with.
    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    fn matches(&self, ph: &dyn Placeholder) -> bool {
        self.start == ph.position() && self.style == ph.style()
    }
}

impl Render for CompiledFilter {
    /// Replay the clause. The generator must be where it was when the clause
    /// was produced, and is advanced past the clause's placeholders.
    fn render(&self, sb: &mut String, ph: &mut dyn Placeholder) -> QueryResult<Vec<FilterValue>> {
        if !self.matches(ph) {
            return Err(QueryError::new(
                ErrorCode::Consistency,
                format!(
                    "Compiled filter expects {} placeholders from position {}, generator is {} at {}",
                    self.style,
                    self.start,
                    ph.style(),
                    ph.position()
                ),
            ));
        }
        sb.push_str(&self.clause);
        ph.advance_by(self.args.len());
        Ok(self.args.clone())
    }

    fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}
