//! Metadata compiler: declarations in, explicit schemas out.
//!
//! Compilation is pure. Compiling the same declaration twice yields
//! structurally identical schemas with identical fingerprints.

use tracing::debug;

use super::config::ColumnConfig;
use super::constraint::ConstraintDef;
use super::entity::{EntityDecl, ViewDecl};
use super::field::{FieldDecl, FieldKind};
use super::relation::RelationEdge;
use super::schema::{ColumnDef, ColumnKind, TableSchema, ViewSchema};
use super::types::{ColumnType, ScalarType};
use crate::error::{Error, Result};

/// Compile a persisted entity declaration into a table schema.
pub fn compile(decl: &EntityDecl) -> Result<TableSchema> {
    let entity = decl.name();

    for configured in decl.table_config.keys() {
        if decl.shape.get_field(configured).is_none() {
            return Err(Error::Configuration(format!(
                "{}: table config names undeclared field '{}'",
                entity, configured
            )));
        }
    }

    let primary_key = resolve_primary_key(decl)?;

    let mut columns = Vec::with_capacity(decl.shape.fields.len());
    let mut relations = Vec::new();
    let mut constraints = Vec::new();

    for field in &decl.shape.fields {
        let config = decl.column_config(&field.name);
        let column = describe_column(entity, field, &config)?;

        if columns.iter().any(|c: &ColumnDef| c.name == column.name) {
            return Err(Error::Configuration(format!(
                "{}: column name '{}' used by more than one field",
                entity, column.name
            )));
        }

        if let FieldKind::Foreign { entity: target } = &field.kind {
            let edge = RelationEdge::new(
                entity,
                &decl.table_name,
                &field.name,
                &column.name,
                target,
            );
            constraints.push(ConstraintDef::foreign_key(
                edge.name.clone(),
                column.name.clone(),
                target.clone(),
            ));
            relations.push(edge);
        }
        if column.unique {
            constraints.push(ConstraintDef::unique(&decl.table_name, column.name.clone()));
        }

        columns.push(column);
    }

    let pk_column = columns
        .iter_mut()
        .find(|c| c.field == primary_key)
        .ok_or_else(|| Error::Schema(format!("{}: no primary key", entity)))?;
    if pk_column.kind == ColumnKind::Structured {
        return Err(Error::Schema(format!(
            "{}: structured field '{}' cannot be the primary key",
            entity, primary_key
        )));
    }
    pk_column.nullable = false;
    pk_column.autoincrement = pk_column.column_type == ColumnType::Integer;

    let schema = TableSchema {
        entity: entity.to_string(),
        table_name: decl.table_name.clone(),
        primary_key,
        columns,
        relations,
        constraints,
    };

    debug!(
        entity = %schema.entity,
        table = %schema.table_name,
        columns = schema.columns.len(),
        relations = schema.relations.len(),
        "compiled entity"
    );

    Ok(schema)
}

/// Compile a computed view declaration.
pub fn compile_view(decl: &ViewDecl) -> Result<ViewSchema> {
    if decl.cache_key.is_empty() {
        return Err(Error::Configuration(format!(
            "{}: view declares no cache_key",
            decl.name()
        )));
    }
    if decl.shape.get_field(&decl.cache_field).is_none() {
        return Err(Error::Configuration(format!(
            "{}: cache_field '{}' is not a declared field",
            decl.name(),
            decl.cache_field
        )));
    }
    for field in &decl.shape.fields {
        if field.is_foreign() {
            return Err(Error::Configuration(format!(
                "{}.{}: views cannot declare foreign fields",
                decl.name(),
                field.name
            )));
        }
    }

    Ok(ViewSchema {
        shape: decl.shape.clone(),
        cache_key: decl.cache_key.clone(),
        cache_field: decl.cache_field.clone(),
    })
}

/// Resolve the single primary-key field.
///
/// The override (or the convention's key) names the field; exactly one field
/// must carry the `primary_key` attribute, and it must be that field.
fn resolve_primary_key(decl: &EntityDecl) -> Result<String> {
    let entity = decl.name();

    let flagged: Vec<&str> = decl
        .shape
        .fields
        .iter()
        .filter(|f| decl.column_config(&f.name).primary_key)
        .map(|f| f.name.as_str())
        .collect();
    if flagged.len() > 1 {
        return Err(Error::Schema(format!(
            "{}: {} fields marked primary_key ({})",
            entity,
            flagged.len(),
            flagged.join(", ")
        )));
    }

    if let Some(pk) = &decl.primary_key_override {
        if decl.shape.get_field(pk).is_none() {
            return Err(Error::Schema(format!(
                "{}: primary key override names undeclared field '{}'",
                entity, pk
            )));
        }
    }

    let resolved = decl
        .get_primary_key()
        .ok_or_else(|| Error::Schema(format!("{}: no primary key", entity)))?;

    match flagged.first() {
        None => Err(Error::Schema(format!(
            "{}: no primary key ('{}' is not marked primary_key)",
            entity, resolved
        ))),
        Some(&marked) if marked != resolved => Err(Error::Schema(format!(
            "{}: field '{}' is marked primary_key but the key resolves to '{}'",
            entity, marked, resolved
        ))),
        Some(_) => Ok(resolved.to_string()),
    }
}

/// Merge a field's intrinsic type with its storage attributes.
fn describe_column(entity: &str, field: &FieldDecl, config: &ColumnConfig) -> Result<ColumnDef> {
    let misconfigured = |reason: &str| {
        Err(Error::Configuration(format!(
            "{}.{}: {}",
            entity, field.name, reason
        )))
    };

    let (column_type, kind) = match &field.kind {
        FieldKind::Scalar(scalar) => {
            if config.storage_type.is_some() {
                return misconfigured("storage type override only applies to foreign fields");
            }
            if config.jsonb {
                return misconfigured("jsonb only applies to structured fields");
            }
            (text_type(*scalar, config.length, entity, field)?, ColumnKind::Scalar)
        }
        FieldKind::Foreign { entity: target } => {
            if config.name.is_none() {
                return misconfigured("foreign field requires a physical column name");
            }
            let stored = match config.storage_type {
                Some(stored) => stored,
                None => return misconfigured("foreign field requires a stored column type"),
            };
            if config.jsonb {
                return misconfigured("jsonb only applies to structured fields");
            }
            (
                text_type(stored, config.length, entity, field)?,
                ColumnKind::Foreign {
                    entity: target.clone(),
                },
            )
        }
        FieldKind::Structured => {
            if config.storage_type.is_some() {
                return misconfigured("storage type override only applies to foreign fields");
            }
            if config.length.is_some() {
                return misconfigured("length only applies to text fields");
            }
            let column_type = if config.jsonb {
                ColumnType::Jsonb
            } else {
                ColumnType::Json
            };
            (column_type, ColumnKind::Structured)
        }
    };

    Ok(ColumnDef {
        field: field.name.clone(),
        name: config.name.clone().unwrap_or_else(|| field.name.clone()),
        column_type,
        kind,
        nullable: field.optional,
        primary_key: config.primary_key,
        autoincrement: false,
        indexed: config.index,
        unique: config.unique,
        default: config.default.clone(),
        onupdate: config.onupdate.clone(),
        validator: field.validator.as_ref().map(|v| v.name().to_string()),
    })
}

fn text_type(
    scalar: ScalarType,
    length: Option<u32>,
    entity: &str,
    field: &FieldDecl,
) -> Result<ColumnType> {
    match (scalar, length) {
        (ScalarType::String, Some(n)) => Ok(ColumnType::VarChar(n)),
        (_, Some(_)) => Err(Error::Configuration(format!(
            "{}.{}: length only applies to text fields",
            entity, field.name
        ))),
        (scalar, None) => Ok(scalar.column_type()),
    }
}
