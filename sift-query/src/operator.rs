//! Filter document operators and their SQL spelling.

use std::fmt;

/// SQL keywords shared by expressions and the filter compiler.
pub mod keyword {
    /// Conjunction.
    pub const AND: &str = "AND";
    /// Disjunction.
    pub const OR: &str = "OR";
    /// Negation.
    pub const NOT: &str = "NOT";
    /// `IS` test against a literal.
    pub const IS: &str = "IS";
    /// Negated `IS` test.
    pub const IS_NOT: &str = "IS NOT";
    /// Equality.
    pub const EQ: &str = "=";
    /// Inequality.
    pub const NEQ: &str = "<>";
    /// Greater than.
    pub const GT: &str = ">";
    /// Greater than or equal.
    pub const GTE: &str = ">=";
    /// Less than.
    pub const LT: &str = "<";
    /// Less than or equal.
    pub const LTE: &str = "<=";
    /// List membership.
    pub const IN: &str = "IN";
    /// Negated list membership.
    pub const NOT_IN: &str = "NOT IN";
    /// Case-sensitive pattern match.
    pub const LIKE: &str = "LIKE";
    /// Negated `LIKE`.
    pub const NOT_LIKE: &str = "NOT LIKE";
    /// Case-insensitive pattern match (PostgreSQL).
    pub const ILIKE: &str = "ILIKE";
    /// Negated `ILIKE`.
    pub const NOT_ILIKE: &str = "NOT ILIKE";
    /// Inclusive range.
    pub const BETWEEN: &str = "BETWEEN";
    /// SQL regular expression match.
    pub const SIMILAR_TO: &str = "SIMILAR TO";
    /// Negated `SIMILAR TO`.
    pub const NOT_SIMILAR_TO: &str = "NOT SIMILAR TO";
    /// Null test.
    pub const IS_NULL: &str = "IS NULL";
    /// Non-null test.
    pub const IS_NOT_NULL: &str = "IS NOT NULL";
    /// The null literal.
    pub const NULL: &str = "NULL";
    /// POSIX regex match (PostgreSQL).
    pub const REGEX_MATCH: &str = "~";
    /// Case-insensitive POSIX regex match.
    pub const IREGEX_MATCH: &str = "~*";
    /// Negated POSIX regex match.
    pub const NOT_REGEX_MATCH: &str = "!~";
    /// Negated case-insensitive POSIX regex match.
    pub const NOT_IREGEX_MATCH: &str = "!~*";
}

/// The closed set of `$` operators accepted in filter documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `$and`: every child holds.
    And,
    /// `$or`: any child holds.
    Or,
    /// `$not`: the child does not hold.
    Not,
    /// `$is`
    Is,
    /// `$isnot`
    IsNot,
    /// `$eq`
    Eq,
    /// `$neq`
    Neq,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`: value is a list of members.
    In,
    /// `$nin`
    NotIn,
    /// `$like`
    Like,
    /// `$nlike`
    NotLike,
    /// `$ilike`
    ILike,
    /// `$nilike`
    NotILike,
    /// `$between`: value is `[low, high]`.
    Between,
    /// `$similarto`
    SimilarTo,
    /// `$nsimilarto`
    NotSimilarTo,
}

impl Operator {
    /// Every operator, in documentation order.
    pub const ALL: [Operator; 20] = [
        Self::And,
        Self::Or,
        Self::Not,
        Self::Is,
        Self::IsNot,
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::NotIn,
        Self::Like,
        Self::NotLike,
        Self::ILike,
        Self::NotILike,
        Self::Between,
        Self::SimilarTo,
        Self::NotSimilarTo,
    ];

    /// Look up an operator by its document key (e.g. `$gte`).
    pub fn from_term(term: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_term() == term)
    }

    /// The document key for this operator.
    pub const fn as_term(self) -> &'static str {
        match self {
            Self::And => "$and",
            Self::Or => "$or",
            Self::Not => "$not",
            Self::Is => "$is",
            Self::IsNot => "$isnot",
            Self::Eq => "$eq",
            Self::Neq => "$neq",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::NotIn => "$nin",
            Self::Like => "$like",
            Self::NotLike => "$nlike",
            Self::ILike => "$ilike",
            Self::NotILike => "$nilike",
            Self::Between => "$between",
            Self::SimilarTo => "$similarto",
            Self::NotSimilarTo => "$nsimilarto",
        }
    }

    /// The SQL spelling of this operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => keyword::AND,
            Self::Or => keyword::OR,
            Self::Not => keyword::NOT,
            Self::Is => keyword::IS,
            Self::IsNot => keyword::IS_NOT,
            Self::Eq => keyword::EQ,
            Self::Neq => keyword::NEQ,
            Self::Gt => keyword::GT,
            Self::Gte => keyword::GTE,
            Self::Lt => keyword::LT,
            Self::Lte => keyword::LTE,
            Self::In => keyword::IN,
            Self::NotIn => keyword::NOT_IN,
            Self::Like => keyword::LIKE,
            Self::NotLike => keyword::NOT_LIKE,
            Self::ILike => keyword::ILIKE,
            Self::NotILike => keyword::NOT_ILIKE,
            Self::Between => keyword::BETWEEN,
            Self::SimilarTo => keyword::SIMILAR_TO,
            Self::NotSimilarTo => keyword::NOT_SIMILAR_TO,
        }
    }

    /// Logical operators group other conditions instead of comparing a field.
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }

    /// Operators whose value is a list of members.
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A document key names an operator when it starts with `$`.
#[inline]
pub fn is_operator_term(term: &str) -> bool {
    term.starts_with('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_term_round_trips() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_term(op.as_term()), Some(op));
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive_and_closed() {
        assert_eq!(Operator::from_term("$nin"), Some(Operator::NotIn));
        assert_eq!(Operator::from_term("$NIN"), None);
        assert_eq!(Operator::from_term("$foo"), None);
        assert_eq!(Operator::from_term("gt"), None);
    }

    #[test]
    fn test_sql_spelling() {
        assert_eq!(Operator::Neq.as_sql(), "<>");
        assert_eq!(Operator::NotSimilarTo.to_string(), "NOT SIMILAR TO");
        assert!(Operator::Or.is_logical());
        assert!(Operator::NotIn.is_membership());
        assert!(!Operator::Between.is_logical());
    }
}
