//! Table constraints derived from the table config.

use serde::Serialize;

/// A constraint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConstraintDef {
    /// Uniqueness constraint on a single column.
    Unique {
        /// Constraint name.
        name: String,
        /// Constrained column.
        column: String,
    },
    /// Foreign key constraint.
    ForeignKey {
        /// Constraint name.
        name: String,
        /// Foreign key column.
        column: String,
        /// Referenced entity.
        references_entity: String,
    },
}

impl ConstraintDef {
    /// Create a unique constraint.
    pub fn unique(table_name: &str, column: impl Into<String>) -> Self {
        let column = column.into();
        ConstraintDef::Unique {
            name: format!("{}_{}_key", table_name, column),
            column,
        }
    }

    /// Create a foreign key constraint.
    pub fn foreign_key(
        name: impl Into<String>,
        column: impl Into<String>,
        references_entity: impl Into<String>,
    ) -> Self {
        ConstraintDef::ForeignKey {
            name: name.into(),
            column: column.into(),
            references_entity: references_entity.into(),
        }
    }

    /// Get the constraint name.
    pub fn name(&self) -> &str {
        match self {
            ConstraintDef::Unique { name, .. } => name,
            ConstraintDef::ForeignKey { name, .. } => name,
        }
    }

    /// Get the constrained column.
    pub fn column(&self) -> &str {
        match self {
            ConstraintDef::Unique { column, .. } => column,
            ConstraintDef::ForeignKey { column, .. } => column,
        }
    }

    /// Check if this is a unique constraint.
    pub fn is_unique(&self) -> bool {
        matches!(self, ConstraintDef::Unique { .. })
    }

    /// Check if this is a foreign key constraint.
    pub fn is_foreign_key(&self) -> bool {
        matches!(self, ConstraintDef::ForeignKey { .. })
    }
}
