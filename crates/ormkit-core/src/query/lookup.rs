//! `path__to__column__op` lookup expressions.

use std::fmt;

use crate::error::{Error, Result};

/// Separator between lookup segments.
pub const LOOKUP_SEP: &str = "__";

/// Comparison applied by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupOp {
    /// Equality (default).
    Exact,
    /// Case-insensitive string equality.
    IExact,
    /// Substring or JSON array membership.
    Contains,
    /// String prefix.
    StartsWith,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Membership in a list.
    In,
    /// Null check; the operand is a boolean.
    IsNull,
}

impl LookupOp {
    /// Parse an operator suffix.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "exact" => LookupOp::Exact,
            "iexact" => LookupOp::IExact,
            "contains" => LookupOp::Contains,
            "startswith" => LookupOp::StartsWith,
            "gt" => LookupOp::Gt,
            "gte" => LookupOp::Gte,
            "lt" => LookupOp::Lt,
            "lte" => LookupOp::Lte,
            "in" => LookupOp::In,
            "isnull" => LookupOp::IsNull,
            _ => return None,
        })
    }

    /// Operator suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupOp::Exact => "exact",
            LookupOp::IExact => "iexact",
            LookupOp::Contains => "contains",
            LookupOp::StartsWith => "startswith",
            LookupOp::Gt => "gt",
            LookupOp::Gte => "gte",
            LookupOp::Lt => "lt",
            LookupOp::Lte => "lte",
            LookupOp::In => "in",
            LookupOp::IsNull => "isnull",
        }
    }
}

impl fmt::Display for LookupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed lookup: relationship path, target field, operator.
///
/// `user__email` parses to path `["user"]`, field `email`, op `exact`;
/// `number__startswith` to an empty path, field `number`, op `startswith`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Foreign fields to traverse, outermost first.
    pub path: Vec<String>,
    /// Field compared on the final entity.
    pub field: String,
    /// Comparison.
    pub op: LookupOp,
}

impl Lookup {
    /// Parse a lookup expression. Segments are not resolved against any schema here.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut segments: Vec<&str> = expr.split(LOOKUP_SEP).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::Configuration(format!(
                "malformed lookup '{}'",
                expr
            )));
        }

        let op = match segments.last().and_then(|s| LookupOp::parse(s)) {
            Some(op) if segments.len() > 1 => {
                segments.pop();
                op
            }
            _ => LookupOp::Exact,
        };

        let field = segments
            .pop()
            .ok_or_else(|| Error::Configuration(format!("malformed lookup '{}'", expr)))?
            .to_string();

        Ok(Self {
            path: segments.into_iter().map(String::from).collect(),
            field,
            op,
        })
    }

    /// Whether the lookup crosses a relationship.
    pub fn is_traversal(&self) -> bool {
        !self.path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_field() {
        let lookup = Lookup::parse("email").unwrap();
        assert!(lookup.path.is_empty());
        assert_eq!(lookup.field, "email");
        assert_eq!(lookup.op, LookupOp::Exact);
    }

    #[test]
    fn test_traversal_with_operator() {
        let lookup = Lookup::parse("user__email__iexact").unwrap();
        assert_eq!(lookup.path, vec!["user".to_string()]);
        assert_eq!(lookup.field, "email");
        assert_eq!(lookup.op, LookupOp::IExact);
        assert!(lookup.is_traversal());
    }

    #[test]
    fn test_field_named_like_operator() {
        let lookup = Lookup::parse("in").unwrap();
        assert_eq!(lookup.field, "in");
        assert_eq!(lookup.op, LookupOp::Exact);
    }

    #[test]
    fn test_malformed() {
        assert!(Lookup::parse("").is_err());
        assert!(Lookup::parse("user____email").is_err());
        assert!(Lookup::parse("user__").is_err());
    }
}
