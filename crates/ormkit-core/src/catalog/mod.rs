//! Declarations and the metadata compiler.
//!
//! Entities and views are declared as plain data (`EntityDecl`, `ViewDecl`)
//! and compiled into explicit schemas (`TableSchema`, `ViewSchema`) that the
//! gateway, the initializer and the storage engine consume.

mod compiler;
mod config;
mod constraint;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use compiler::{compile, compile_view};
pub use config::{ColumnConfig, DefaultValue, ValueProducer};
pub use constraint::ConstraintDef;
pub use entity::{Convention, EntityDecl, FieldSet, ViewDecl};
pub use field::{FieldDecl, FieldKind};
pub use relation::RelationEdge;
pub use schema::{ColumnDef, ColumnKind, TableSchema, ViewSchema};
pub use types::{ColumnType, ScalarType};
