//! Filter document nodes: parsing from JSON and the SQL walk.

use serde_json::Value;

use super::FieldMapper;
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::operator::{Operator, is_operator_term, keyword};
use crate::placeholder::Placeholder;

/// How the children of a group node are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Joiner {
    /// Object form: every entry must hold.
    All,
    /// Array form: any element may hold.
    Any,
}

impl Joiner {
    fn keyword(self) -> &'static str {
        match self {
            Self::All => keyword::AND,
            Self::Any => keyword::OR,
        }
    }
}

/// The value carried by a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypedValue {
    /// The node groups its children.
    Operator(Joiner),
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Members of `$in`/`$nin`, or the two bounds of `$between`.
    Array(Vec<FilterValue>),
}

impl TypedValue {
    fn to_filter_value(&self) -> Option<FilterValue> {
        match self {
            Self::Null => Some(FilterValue::Null),
            Self::Bool(b) => Some(FilterValue::Bool(*b)),
            Self::Number(n) => Some(FilterValue::from(Value::Number(n.clone()))),
            Self::String(s) => Some(FilterValue::String(s.clone())),
            Self::Operator(_) | Self::Array(_) => None,
        }
    }
}

/// One key of a filter document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TreeNode {
    pub term: String,
    pub value: TypedValue,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(term: &str, value: TypedValue) -> Self {
        Self {
            term: term.to_string(),
            value,
            children: Vec::new(),
        }
    }

    fn group(term: &str, joiner: Joiner, children: Vec<TreeNode>) -> Self {
        Self {
            term: term.to_string(),
            value: TypedValue::Operator(joiner),
            children,
        }
    }

    /// A node renders nothing when it groups only empty children or holds an
    /// empty member list.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            TypedValue::Operator(_) => self.children.iter().all(TreeNode::is_empty),
            TypedValue::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    fn live_children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.iter().filter(|c| !c.is_empty())
    }
}

// ============== Parsing ==============

/// Parse a whole filter document under the root `key`.
pub(crate) fn parse_document(key: &str, doc: &Value) -> QueryResult<TreeNode> {
    match doc {
        Value::Object(map) => Ok(TreeNode::group(key, Joiner::All, parse_entries(map)?)),
        Value::Array(items) => Ok(TreeNode::group(key, Joiner::Any, parse_alternatives(key, items)?)),
        other => Err(QueryError::malformed_filter(format!(
            "Filter document must be an object or an array of objects, got {}",
            json_kind(other)
        ))),
    }
}

fn parse_entries(map: &serde_json::Map<String, Value>) -> QueryResult<Vec<TreeNode>> {
    map.iter()
        .filter(|(term, _)| !term.trim().is_empty())
        .map(|(term, value)| parse_node(term, value))
        .collect()
}

/// Each array element is an alternative; multi-key elements keep their
/// entries together under an implicit `$and`.
fn parse_alternatives(term: &str, items: &[Value]) -> QueryResult<Vec<TreeNode>> {
    let mut children = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(map) = item else {
            return Err(QueryError::malformed_filter(format!(
                "Array under `{}` must contain objects, got {}",
                term,
                json_kind(item)
            ))
            .with_field(term));
        };
        let mut entries = parse_entries(map)?;
        match entries.len() {
            0 => {}
            1 => children.append(&mut entries),
            _ => children.push(TreeNode::group(Operator::And.as_term(), Joiner::All, entries)),
        }
    }
    Ok(children)
}

fn parse_node(term: &str, value: &Value) -> QueryResult<TreeNode> {
    let op = Operator::from_term(term);
    let node = match value {
        Value::Object(map) => TreeNode::group(term, Joiner::All, parse_entries(map)?),
        Value::Array(items) if op == Some(Operator::Between) => {
            if items.len() != 2 {
                return Err(QueryError::malformed_filter(format!(
                    "`$between` expects exactly two values, got {}",
                    items.len()
                )));
            }
            TreeNode::leaf(term, TypedValue::Array(members(term, items)?))
        }
        Value::Array(items) if op.is_some_and(Operator::is_membership) => {
            TreeNode::leaf(term, TypedValue::Array(members(term, items)?))
        }
        Value::Array(items) => TreeNode::group(term, Joiner::Any, parse_alternatives(term, items)?),
        _ if op == Some(Operator::Between) || op.is_some_and(Operator::is_membership) => {
            return Err(QueryError::malformed_filter(format!(
                "`{}` expects an array, got {}",
                term,
                json_kind(value)
            )));
        }
        Value::Null => TreeNode::leaf(term, TypedValue::Null),
        Value::Bool(b) => TreeNode::leaf(term, TypedValue::Bool(*b)),
        Value::Number(n) => TreeNode::leaf(term, TypedValue::Number(n.clone())),
        Value::String(s) => TreeNode::leaf(term, TypedValue::String(s.clone())),
    };
    Ok(node)
}

/// Values of `$between`, `$in` and `$nin` must be scalars.
fn members(term: &str, items: &[Value]) -> QueryResult<Vec<FilterValue>> {
    items
        .iter()
        .map(|item| match item {
            Value::Array(_) | Value::Object(_) => Err(QueryError::malformed_filter(format!(
                "`{}` expects scalar values, got {}",
                term,
                json_kind(item)
            ))),
            _ => Ok(FilterValue::from(item.clone())),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============== Rendering ==============

/// Output of one walk over a tree.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    pub clause: String,
    pub args: Vec<FilterValue>,
    pub fields: Vec<String>,
    pub sql_fields: Vec<String>,
}

/// Renders nodes into SQL, drawing placeholders in document order.
pub(crate) struct Compiler<'a> {
    mapper: Option<&'a FieldMapper>,
    ph: &'a mut dyn Placeholder,
    out: Walk,
}

impl<'a> Compiler<'a> {
    pub fn new(mapper: Option<&'a FieldMapper>, ph: &'a mut dyn Placeholder) -> Self {
        Self {
            mapper,
            ph,
            out: Walk::default(),
        }
    }

    /// Render the root node as a parenthesized group of its children.
    pub fn run(mut self, root: &TreeNode) -> QueryResult<Walk> {
        if !root.is_empty() {
            let joiner = match root.value {
                TypedValue::Operator(joiner) => joiner,
                _ => Joiner::All,
            };
            self.group(root, joiner.keyword())?;
        }
        Ok(self.out)
    }

    fn group(&mut self, node: &TreeNode, joiner: &str) -> QueryResult<()> {
        self.out.clause.push('(');
        for (i, child) in node.live_children().enumerate() {
            if i > 0 {
                self.push_keyword(joiner);
            }
            self.node(child)?;
        }
        self.out.clause.push(')');
        Ok(())
    }

    fn node(&mut self, node: &TreeNode) -> QueryResult<()> {
        if !is_operator_term(&node.term) {
            return self.field(node);
        }

        let op = lookup(&node.term)?;
        if !op.is_logical() {
            return Err(QueryError::malformed_filter(format!(
                "Operator `{}` must be nested under a field",
                node.term
            )));
        }
        if !matches!(node.value, TypedValue::Operator(_)) {
            return Err(QueryError::malformed_filter(format!(
                "Operator `{}` expects an object or an array",
                node.term
            )));
        }

        match op {
            Operator::Not => {
                self.out.clause.push('(');
                self.out.clause.push_str(keyword::NOT);
                self.out.clause.push(' ');
                let live: Vec<&TreeNode> = node.live_children().collect();
                match live.as_slice() {
                    [only] => self.node(only)?,
                    _ => self.group(node, keyword::AND)?,
                }
                self.out.clause.push(')');
                Ok(())
            }
            _ => self.group(node, op.as_sql()),
        }
    }

    fn field(&mut self, node: &TreeNode) -> QueryResult<()> {
        let column = self.map_field(&node.term)?;
        match node.value {
            TypedValue::Operator(joiner) => self.conditions(&column, node, joiner.keyword()),
            _ => self.comparison(&column, Operator::Eq, &node.value),
        }
    }

    /// Apply every operator child of a field node to `column`.
    fn conditions(&mut self, column: &str, node: &TreeNode, joiner: &str) -> QueryResult<()> {
        let live: Vec<&TreeNode> = node.live_children().collect();
        if let [only] = live.as_slice() {
            return self.condition(column, only);
        }

        self.out.clause.push('(');
        for (i, child) in live.iter().enumerate() {
            if i > 0 {
                self.push_keyword(joiner);
            }
            self.condition(column, child)?;
        }
        self.out.clause.push(')');
        Ok(())
    }

    fn condition(&mut self, column: &str, node: &TreeNode) -> QueryResult<()> {
        if !is_operator_term(&node.term) {
            return Err(QueryError::malformed_filter(format!(
                "Field `{}` cannot be nested under another field",
                node.term
            ))
            .with_field(&node.term));
        }

        let op = lookup(&node.term)?;
        match (op, &node.value) {
            (Operator::Not, TypedValue::Operator(_)) => {
                self.out.clause.push('(');
                self.out.clause.push_str(keyword::NOT);
                self.out.clause.push(' ');
                self.conditions(column, node, keyword::AND)?;
                self.out.clause.push(')');
                Ok(())
            }
            (Operator::And | Operator::Or, TypedValue::Operator(_)) => {
                self.conditions(column, node, op.as_sql())
            }
            (_, TypedValue::Operator(_)) => Err(QueryError::malformed_filter(format!(
                "Operator `{}` expects a value, not an object",
                node.term
            ))),
            _ if op.is_logical() => Err(QueryError::malformed_filter(format!(
                "Operator `{}` expects an object or an array",
                node.term
            ))),
            (_, value) => self.comparison(column, op, value),
        }
    }

    /// Write `(column OP value)`, binding the value unless it is NULL.
    fn comparison(&mut self, column: &str, op: Operator, value: &TypedValue) -> QueryResult<()> {
        let mut text = String::with_capacity(column.len() + 16);
        text.push('(');
        text.push_str(column);
        text.push(' ');

        match (op, value) {
            (Operator::Eq | Operator::Is, TypedValue::Null) => text.push_str(keyword::IS_NULL),
            (Operator::Neq | Operator::IsNot, TypedValue::Null) => {
                text.push_str(keyword::IS_NOT_NULL)
            }
            (_, TypedValue::Null) => {
                text.push_str(op.as_sql());
                text.push(' ');
                text.push_str(keyword::NULL);
            }
            (Operator::Is | Operator::IsNot, TypedValue::Bool(b)) => {
                text.push_str(op.as_sql());
                text.push_str(if *b { " TRUE" } else { " FALSE" });
            }
            (Operator::Is | Operator::IsNot, _) => {
                return Err(QueryError::malformed_filter(format!(
                    "Operator `{}` expects null or a boolean",
                    op.as_term()
                )));
            }
            (Operator::In | Operator::NotIn, TypedValue::Array(items)) => {
                text.push_str(op.as_sql());
                text.push_str(" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        text.push_str(", ");
                    }
                    text.push_str(&self.ph.next());
                    self.out.args.push(item.clone());
                }
                text.push(')');
            }
            (Operator::Between, TypedValue::Array(items)) if items.len() == 2 => {
                text.push_str(keyword::BETWEEN);
                text.push(' ');
                text.push_str(&self.ph.next());
                text.push(' ');
                text.push_str(keyword::AND);
                text.push(' ');
                text.push_str(&self.ph.next());
                self.out.args.extend(items.iter().cloned());
            }
            (_, scalar) => match scalar.to_filter_value() {
                Some(arg) if !op.is_membership() && op != Operator::Between => {
                    text.push_str(op.as_sql());
                    text.push(' ');
                    text.push_str(&self.ph.next());
                    self.out.args.push(arg);
                }
                _ => {
                    return Err(QueryError::malformed_filter(format!(
                        "Operator `{}` cannot be applied to this value",
                        op.as_term()
                    )));
                }
            },
        }

        text.push(')');
        self.out.clause.push_str(&text);
        Ok(())
    }

    fn map_field(&mut self, term: &str) -> QueryResult<String> {
        let column = match self.mapper {
            Some(mapper) => mapper(term)?,
            None => term.to_string(),
        };
        self.out.fields.push(term.to_string());
        self.out.sql_fields.push(column.clone());
        Ok(column)
    }

    fn push_keyword(&mut self, keyword: &str) {
        self.out.clause.push(' ');
        self.out.clause.push_str(keyword);
        self.out.clause.push(' ');
    }
}

fn lookup(term: &str) -> QueryResult<Operator> {
    Operator::from_term(term).ok_or_else(|| QueryError::unknown_operator(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_skips_blank_keys() {
        let root = parse_document("filter", &json!({" ": {}, "a": 1})).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].term, "a");
    }

    #[test]
    fn test_parse_keeps_document_order() {
        let root = parse_document("filter", &json!({"z": 1, "a": 2, "m": 3})).unwrap();
        let terms: Vec<&str> = root.children.iter().map(|c| c.term.as_str()).collect();
        assert_eq!(terms, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_between_arity() {
        let err = parse_document("filter", &json!({"age": {"$between": [1]}})).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::MalformedFilter);
        let err = parse_document("filter", &json!({"age": {"$between": 5}})).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::MalformedFilter);
    }

    #[test]
    fn test_parse_membership_requires_array() {
        let err = parse_document("filter", &json!({"id": {"$in": 5}})).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::MalformedFilter);
    }

    #[test]
    fn test_parse_membership_rejects_nested_values() {
        for doc in [
            json!({"id": {"$in": [1, [2, 3]]}}),
            json!({"id": {"$nin": [{"a": 1}]}}),
            json!({"age": {"$between": [1, [2]]}}),
        ] {
            let err = parse_document("filter", &doc).unwrap_err();
            assert_eq!(err.code, crate::ErrorCode::MalformedFilter, "{doc}");
        }

        let root = parse_document("filter", &json!({"id": {"$in": [1, "a", null, true]}})).unwrap();
        assert!(!root.is_empty());
    }

    #[test]
    fn test_parse_alternatives_group_multi_key_objects() {
        let root = parse_document("filter", &json!({"$or": [{"a": 1, "b": 2}, {"c": 3}]})).unwrap();
        let or = &root.children[0];
        assert_eq!(or.value, TypedValue::Operator(Joiner::Any));
        assert_eq!(or.children.len(), 2);
        assert_eq!(or.children[0].term, "$and");
        assert_eq!(or.children[1].term, "c");
    }

    #[test]
    fn test_parse_rejects_scalar_document() {
        assert!(parse_document("filter", &json!(5)).is_err());
        assert!(parse_document("filter", &json!([1, 2])).is_err());
    }

    #[test]
    fn test_empty_membership_is_empty() {
        let root = parse_document("filter", &json!({"value": {"$in": []}})).unwrap();
        assert!(root.is_empty());
    }
}
