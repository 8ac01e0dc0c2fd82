//! Compiled table and view schemas.

use serde::Serialize;

use super::config::{DefaultValue, ValueProducer};
use super::constraint::ConstraintDef;
use super::entity::FieldSet;
use super::relation::RelationEdge;
use super::field::FieldKind;
use super::types::ColumnType;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::validation::coerce;

/// What kind of field a column was compiled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// Plain scalar.
    Scalar,
    /// Foreign key to another entity.
    Foreign {
        /// Referenced entity.
        entity: String,
    },
    /// Structured JSON value.
    Structured,
}

/// One compiled column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    /// Logical field name.
    pub field: String,
    /// Physical column name.
    pub name: String,
    /// Physical column type.
    pub column_type: ColumnType,
    /// Field kind.
    pub kind: ColumnKind,
    /// Whether NULL is stored for unset values.
    pub nullable: bool,
    /// Primary-key column.
    pub primary_key: bool,
    /// Key assigned by the store when unset on insert.
    pub autoincrement: bool,
    /// Secondary index requested.
    pub indexed: bool,
    /// Uniqueness enforced.
    pub unique: bool,
    /// Insert-time default.
    pub default: Option<DefaultValue>,
    /// Update-time producer.
    pub onupdate: Option<ValueProducer>,
    /// Name of the semantic validator, if any.
    pub validator: Option<String>,
}

impl ColumnDef {
    /// Whether the store must maintain an index for this column.
    pub fn needs_index(&self) -> bool {
        self.indexed || self.unique
    }
}

/// A compiled entity: columns, key, relationship edges, constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    /// Entity name.
    pub entity: String,
    /// Physical table name.
    pub table_name: String,
    /// Primary-key field name.
    pub primary_key: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Outgoing relationship edges.
    pub relations: Vec<RelationEdge>,
    /// Constraints.
    pub constraints: Vec<ConstraintDef>,
}

impl TableSchema {
    /// Column compiled from a logical field.
    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Column by physical name.
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary-key column.
    pub fn primary_key_column(&self) -> Result<&ColumnDef> {
        self.column(&self.primary_key).ok_or_else(|| {
            Error::Schema(format!(
                "{}: primary key column '{}' missing",
                self.entity, self.primary_key
            ))
        })
    }

    /// Outgoing edge declared on `field`.
    pub fn relation(&self, field: &str) -> Option<&RelationEdge> {
        self.relations.iter().find(|r| r.field == field)
    }

    /// Columns that need a store-side index.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.needs_index())
    }

    /// Columns with a uniqueness constraint (the primary key excluded).
    pub fn unique_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.unique && !c.primary_key)
    }

    /// Map a field-keyed row to a column-keyed row. Undeclared entries are dropped.
    pub fn to_storage(&self, row: &Row) -> Row {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), row.get(&c.field).cloned().unwrap_or_default()))
            .collect()
    }

    /// Coerce foreign-key values of a field-keyed row to their stored column type.
    pub fn conform_foreign_keys(&self, row: &mut Row) -> Result<()> {
        for column in &self.columns {
            if !matches!(column.kind, ColumnKind::Foreign { .. }) {
                continue;
            }
            let scalar = match column.column_type.scalar_type() {
                Some(scalar) => scalar,
                None => continue,
            };
            let value = match row.get(&column.field) {
                Some(value) if !value.is_null() => value.clone(),
                _ => continue,
            };
            let value = coerce(&FieldKind::Scalar(scalar), value)
                .map_err(|reason| Error::validation(&self.entity, &column.field, reason))?;
            row.set(column.field.clone(), value);
        }
        Ok(())
    }

    /// Map a column-keyed row back to a field-keyed row.
    pub fn from_storage(&self, row: &Row) -> Row {
        self.columns
            .iter()
            .map(|c| (c.field.clone(), row.get(&c.name).cloned().unwrap_or_default()))
            .collect()
    }

    /// Fill unset columns from their insert-time defaults.
    pub fn apply_insert_defaults(&self, row: &mut Row) {
        for column in &self.columns {
            if let Some(default) = &column.default {
                if row.is_unset(&column.name) {
                    row.set(column.name.clone(), default.evaluate());
                }
            }
        }
    }

    /// Refresh every column that has an update-time producer.
    pub fn apply_update_producers(&self, row: &mut Row) {
        for column in &self.columns {
            if let Some(producer) = &column.onupdate {
                row.set(column.name.clone(), producer.produce());
            }
        }
    }

    /// Canonical serialized form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Hex blake3 digest of the canonical form; equal digests mean identical schemas.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }
}

/// A compiled computed view.
#[derive(Debug, Clone)]
pub struct ViewSchema {
    /// Fields and hooks, used by the validation pipeline.
    pub shape: FieldSet,
    /// Namespace of stored keys.
    pub cache_key: String,
    /// Lookup field.
    pub cache_field: String,
}

impl ViewSchema {
    /// View name.
    pub fn name(&self) -> &str {
        &self.shape.name
    }

    /// Cache-store key for a lookup value: `{cache_key}:{key}`.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.cache_key, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn column(field: &str, name: &str) -> ColumnDef {
        ColumnDef {
            field: field.into(),
            name: name.into(),
            column_type: ColumnType::Integer,
            kind: ColumnKind::Scalar,
            nullable: true,
            primary_key: false,
            autoincrement: false,
            indexed: false,
            unique: false,
            default: None,
            onupdate: None,
            validator: None,
        }
    }

    fn sample() -> TableSchema {
        let mut id = column("id", "id");
        id.primary_key = true;
        id.autoincrement = true;
        let mut user = column("user", "user_id");
        user.kind = ColumnKind::Foreign {
            entity: "User".into(),
        };
        let mut tier = column("tier", "tier");
        tier.default = Some(DefaultValue::Static(Value::Int(1)));
        let mut touched = column("touched", "touched");
        touched.onupdate = Some(ValueProducer::new("seven", || Value::Int(7)));

        TableSchema {
            entity: "Phone".into(),
            table_name: "phones".into(),
            primary_key: "id".into(),
            columns: vec![id, user, tier, touched],
            relations: vec![RelationEdge::new("Phone", "phones", "user", "user_id", "User")],
            constraints: vec![],
        }
    }

    #[test]
    fn test_storage_mapping() {
        let schema = sample();
        let row = Row::new().with("user", 3i64).with("extra", "dropped");
        let stored = schema.to_storage(&row);

        assert_eq!(stored.get("user_id"), Some(&Value::Int(3)));
        assert!(!stored.contains("extra"));
        assert_eq!(schema.from_storage(&stored).get("user"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_foreign_keys_take_stored_type() {
        let schema = sample();
        let mut row = Row::new().with("user", "1").with("tier", "2");
        schema.conform_foreign_keys(&mut row).unwrap();
        assert_eq!(row.get("user"), Some(&Value::Int(1)));
        // only foreign columns are touched
        assert_eq!(row.get("tier"), Some(&Value::from("2")));

        let mut row = Row::new().with("user", "ada");
        assert!(matches!(
            schema.conform_foreign_keys(&mut row),
            Err(Error::Validation { field, .. }) if field == "user"
        ));
    }

    #[test]
    fn test_defaults_only_fill_unset() {
        let schema = sample();
        let mut row = Row::new().with("tier", 5i64);
        schema.apply_insert_defaults(&mut row);
        assert_eq!(row.get("tier"), Some(&Value::Int(5)));

        let mut row = Row::new();
        schema.apply_insert_defaults(&mut row);
        assert_eq!(row.get("tier"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_update_producers_always_refresh() {
        let schema = sample();
        let mut row = Row::new().with("touched", 1i64);
        schema.apply_update_producers(&mut row);
        assert_eq!(row.get("touched"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_fingerprint_is_structural() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let mut c = sample();
        c.table_name = "other".into();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_lookups() {
        let schema = sample();
        assert_eq!(schema.primary_key_column().unwrap().name, "id");
        assert_eq!(schema.relation("user").unwrap().to_entity, "User");
        assert_eq!(schema.column_by_name("user_id").unwrap().field, "user");
        assert!(schema.relation("tier").is_none());
    }
}
