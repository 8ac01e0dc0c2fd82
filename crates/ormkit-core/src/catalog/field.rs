//! Field declarations.

use std::sync::Arc;

use super::types::ScalarType;
use crate::validation::ScalarValidator;
use crate::value::Value;

/// What a declared field holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A typed primitive.
    Scalar(ScalarType),
    /// A reference to another entity; stores the referenced primary key.
    Foreign {
        /// Name of the referenced entity.
        entity: String,
    },
    /// An arbitrary JSON-serializable value.
    Structured,
}

/// A field declaration within an entity or view.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Whether null is an acceptable final value.
    pub optional: bool,
    /// Declared default used when the input omits the field.
    pub default: Option<Value>,
    /// Semantic validator applied after coercion.
    pub validator: Option<Arc<dyn ScalarValidator>>,
}

impl FieldDecl {
    fn with_kind(name: impl Into<String>, kind: FieldKind, optional: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            optional,
            default: None,
            validator: None,
        }
    }

    /// Create a required scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::with_kind(name, FieldKind::Scalar(scalar), false)
    }

    /// Create an optional scalar field (`= None`).
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::with_kind(name, FieldKind::Scalar(scalar), true)
    }

    /// Create a required reference to another entity.
    pub fn foreign(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            FieldKind::Foreign {
                entity: entity.into(),
            },
            false,
        )
    }

    /// Create a structured (JSON) field.
    pub fn structured(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Structured, false)
    }

    /// Allow null as a final value.
    pub fn nullable(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the declared default.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Attach a semantic validator.
    pub fn with_validator(mut self, validator: impl ScalarValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Check if this is a foreign reference.
    pub fn is_foreign(&self) -> bool {
        matches!(self.kind, FieldKind::Foreign { .. })
    }

    /// Check if this is a structured field.
    pub fn is_structured(&self) -> bool {
        matches!(self.kind, FieldKind::Structured)
    }

    /// Declared scalar type, if any.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            FieldKind::Scalar(s) => Some(s),
            _ => None,
        }
    }
}
