//! ormkit core: declarations, the metadata compiler, the validation
//! pipeline, and a reference storage engine.
//!
//! Everything here is synchronous. The async persistence gateway, database
//! handles, and the cache-view layer live in the `ormkit` crate.

pub mod catalog;
pub mod error;
pub mod query;
pub mod row;
pub mod storage;
pub mod validation;
pub mod value;

pub use catalog::{
    compile, compile_view, ColumnConfig, ColumnDef, ColumnKind, ColumnType, ConstraintDef,
    Convention, DefaultValue, EntityDecl, FieldDecl, FieldKind, FieldSet, RelationEdge,
    ScalarType, TableSchema, ValueProducer, ViewDecl, ViewSchema,
};
pub use error::{Error, Result};
pub use query::{Condition, Lookup, LookupOp, Operation, OrderBy, Outcome, Select};
pub use row::Row;
pub use storage::{Record, StorageConfig, StorageEngine, TableInfo};
pub use validation::{
    validate, EmailValidator, PreValidator, ScalarValidator, SecretValidator,
};
pub use value::{FromValue, Secret, Value};
