//! Scalar and column type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar data types a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    String,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
}

/// Physical column types of the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Boolean column.
    Boolean,
    /// Integer column.
    Integer,
    /// Floating point column.
    Float,
    /// Unbounded text.
    Text,
    /// Length-bounded text.
    VarChar(u32),
    /// Timestamp column.
    Timestamp,
    /// Generic serialized-text JSON.
    Json,
    /// Native JSON column.
    Jsonb,
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Float)
    }

    /// Default column type for this scalar.
    pub fn column_type(&self) -> ColumnType {
        match self {
            ScalarType::Bool => ColumnType::Boolean,
            ScalarType::Int => ColumnType::Integer,
            ScalarType::Float => ColumnType::Float,
            ScalarType::String => ColumnType::Text,
            ScalarType::Timestamp => ColumnType::Timestamp,
        }
    }
}

impl ColumnType {
    /// Maximum length for bounded text columns.
    pub fn max_length(&self) -> Option<u32> {
        match self {
            ColumnType::VarChar(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether values are stored as JSON documents.
    pub fn is_json(&self) -> bool {
        matches!(self, ColumnType::Json | ColumnType::Jsonb)
    }

    /// Scalar type whose values this column holds; `None` for JSON columns.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            ColumnType::Boolean => Some(ScalarType::Bool),
            ColumnType::Integer => Some(ScalarType::Int),
            ColumnType::Float => Some(ScalarType::Float),
            ColumnType::Text | ColumnType::VarChar(_) => Some(ScalarType::String),
            ColumnType::Timestamp => Some(ScalarType::Timestamp),
            ColumnType::Json | ColumnType::Jsonb => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::VarChar(n) => write!(f, "VARCHAR({})", n),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Json => write!(f, "JSON"),
            ColumnType::Jsonb => write!(f, "JSONB"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_column_mapping() {
        assert_eq!(ScalarType::Int.column_type(), ColumnType::Integer);
        assert_eq!(ScalarType::String.column_type(), ColumnType::Text);
        assert!(ScalarType::Float.is_numeric());
        assert!(!ScalarType::Bool.is_numeric());
        assert_eq!(ColumnType::VarChar(15).scalar_type(), Some(ScalarType::String));
        assert_eq!(ColumnType::Jsonb.scalar_type(), None);
    }

    #[test]
    fn test_column_display() {
        assert_eq!(ColumnType::VarChar(15).to_string(), "VARCHAR(15)");
        assert_eq!(ColumnType::VarChar(15).max_length(), Some(15));
        assert!(ColumnType::Jsonb.is_json());
    }
}
