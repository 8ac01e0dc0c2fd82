//! Column conditions and their evaluation against stored rows.

use super::lookup::LookupOp;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// A single predicate on a physical column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value` (null matches null).
    Exact { column: String, value: Value },
    /// Case-insensitive string equality.
    IExact { column: String, value: String },
    /// Substring, or element of a JSON array.
    Contains { column: String, value: Value },
    /// String prefix.
    StartsWith { column: String, prefix: String },
    /// `column > value`.
    Gt { column: String, value: Value },
    /// `column >= value`.
    Gte { column: String, value: Value },
    /// `column < value`.
    Lt { column: String, value: Value },
    /// `column <= value`.
    Lte { column: String, value: Value },
    /// `column IN (values)`.
    In { column: String, values: Vec<Value> },
    /// `column IS NULL` when `is_null`, `IS NOT NULL` otherwise.
    IsNull { column: String, is_null: bool },
}

impl Condition {
    /// Build a condition from a lookup operator and its operand.
    pub fn from_lookup(op: LookupOp, column: impl Into<String>, value: Value) -> Result<Self> {
        let column = column.into();

        Ok(match op {
            LookupOp::Exact => Condition::Exact { column, value },
            LookupOp::IExact => match value {
                Value::String(s) => Condition::IExact { column, value: s },
                other => return Err(bad_operand(&column, op, "a string", &other)),
            },
            LookupOp::Contains => Condition::Contains { column, value },
            LookupOp::StartsWith => match value {
                Value::String(prefix) => Condition::StartsWith { column, prefix },
                other => return Err(bad_operand(&column, op, "a string", &other)),
            },
            LookupOp::Gt => Condition::Gt { column, value },
            LookupOp::Gte => Condition::Gte { column, value },
            LookupOp::Lt => Condition::Lt { column, value },
            LookupOp::Lte => Condition::Lte { column, value },
            LookupOp::In => match value {
                Value::Json(serde_json::Value::Array(items)) => Condition::In {
                    column,
                    values: items.into_iter().map(scalar_from_json).collect(),
                },
                other => return Err(bad_operand(&column, op, "a list", &other)),
            },
            LookupOp::IsNull => match value {
                Value::Bool(is_null) => Condition::IsNull { column, is_null },
                other => return Err(bad_operand(&column, op, "a boolean", &other)),
            },
        })
    }

    /// Physical column the condition reads.
    pub fn column(&self) -> &str {
        match self {
            Condition::Exact { column, .. }
            | Condition::IExact { column, .. }
            | Condition::Contains { column, .. }
            | Condition::StartsWith { column, .. }
            | Condition::Gt { column, .. }
            | Condition::Gte { column, .. }
            | Condition::Lt { column, .. }
            | Condition::Lte { column, .. }
            | Condition::In { column, .. }
            | Condition::IsNull { column, .. } => column,
        }
    }

    /// Candidate values an index can serve this condition with, if it is an equality test.
    pub fn equality_values(&self) -> Option<Vec<&Value>> {
        match self {
            Condition::Exact { value, .. } if !value.is_null() => Some(vec![value]),
            Condition::In { values, .. } => Some(values.iter().collect()),
            _ => None,
        }
    }

    /// Evaluate against a column-keyed row. Missing columns read as null.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.column()).unwrap_or(&Value::Null);

        match self {
            Condition::Exact { value, .. } => actual.loose_eq(value),
            Condition::IExact { value, .. } => actual
                .as_str()
                .map(|s| s.to_lowercase() == value.to_lowercase())
                .unwrap_or(false),
            Condition::Contains { value, .. } => contains(actual, value),
            Condition::StartsWith { prefix, .. } => actual
                .as_str()
                .map(|s| s.starts_with(prefix.as_str()))
                .unwrap_or(false),
            Condition::Gt { value, .. } => ordered(actual, value, |o| o.is_gt()),
            Condition::Gte { value, .. } => ordered(actual, value, |o| o.is_ge()),
            Condition::Lt { value, .. } => ordered(actual, value, |o| o.is_lt()),
            Condition::Lte { value, .. } => ordered(actual, value, |o| o.is_le()),
            Condition::In { values, .. } => {
                !actual.is_null() && values.iter().any(|v| actual.loose_eq(v))
            }
            Condition::IsNull { is_null, .. } => actual.is_null() == *is_null,
        }
    }
}

fn bad_operand(column: &str, op: LookupOp, expected: &str, value: &Value) -> Error {
    Error::Configuration(format!(
        "lookup '{}__{}' expects {}, found {}",
        column,
        op,
        expected,
        value.type_name()
    ))
}

/// Evaluate a conjunction of conditions.
pub fn matches_all(conditions: &[Condition], row: &Row) -> bool {
    conditions.iter().all(|c| c.matches(row))
}

/// Null never orders against anything; mismatched types never match.
fn ordered(actual: &Value, value: &Value, pred: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    if actual.is_null() || value.is_null() {
        return false;
    }
    actual.compare(value).map(pred).unwrap_or(false)
}

fn contains(actual: &Value, needle: &Value) -> bool {
    match (actual, needle) {
        (Value::String(haystack), Value::String(n)) => haystack.contains(n.as_str()),
        (Value::Json(serde_json::Value::Array(items)), needle) => {
            let needle = needle.to_plain_json();
            items.iter().any(|item| *item == needle)
        }
        (Value::Json(serde_json::Value::String(haystack)), Value::String(n)) => {
            haystack.contains(n.as_str())
        }
        _ => false,
    }
}

/// Convert a plain JSON scalar into the matching value variant.
pub fn scalar_from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        other => Value::Json(other),
    }
}
