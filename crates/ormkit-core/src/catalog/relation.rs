//! Relationship edges between entities.

use serde::Serialize;

/// A compiled foreign-key link from one entity's field to another entity's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationEdge {
    /// Relation name (unique within the owning table).
    pub name: String,
    /// Owning entity.
    pub from_entity: String,
    /// Logical field on the owning entity.
    pub field: String,
    /// Physical FK column on the owning table.
    pub column: String,
    /// Referenced entity.
    pub to_entity: String,
}

impl RelationEdge {
    /// Create an edge.
    pub fn new(
        from_entity: impl Into<String>,
        table_name: &str,
        field: impl Into<String>,
        column: impl Into<String>,
        to_entity: impl Into<String>,
    ) -> Self {
        let field = field.into();
        Self {
            name: format!("{}_{}_fkey", table_name, field),
            from_entity: from_entity.into(),
            field,
            column: column.into(),
            to_entity: to_entity.into(),
        }
    }
}
