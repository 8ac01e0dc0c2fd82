//! The metadata registry and the schema initializer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use ormkit_core::{
    compile, ColumnKind, Convention, EntityDecl, Error, FieldSet, Operation, Result, TableSchema,
};

use crate::database::Database;
use crate::entity::Entity;
use crate::manager::Manager;

struct Member {
    name: &'static str,
    declare: fn() -> EntityDecl,
}

/// A named family of entities sharing one primary-key convention.
///
/// Each hierarchy is initialized once and bound to its own database handles;
/// several hierarchies can share one registry.
pub struct Hierarchy {
    name: String,
    convention: Convention,
    members: Vec<Member>,
}

impl Hierarchy {
    /// Hierarchy whose entities carry the implicit `id` key.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(name, Convention::Standard)
    }

    /// Hierarchy whose entities name their own key.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Convention::Bare)
    }

    fn new(name: impl Into<String>, convention: Convention) -> Self {
        Self {
            name: name.into(),
            convention,
            members: Vec::new(),
        }
    }

    /// Add an entity type.
    pub fn entity<E: Entity>(mut self) -> Self {
        self.members.push(Member {
            name: E::NAME,
            declare: E::declaration,
        });
        self
    }

    /// Hierarchy name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary-key convention.
    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Names of the member entities, in registration order.
    pub fn entity_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|m| m.name)
    }
}

/// A compiled, registered entity.
#[derive(Clone)]
pub struct Registration {
    /// Compiled table schema.
    pub schema: Arc<TableSchema>,
    /// Fields and hooks for the validation pipeline.
    pub shape: Arc<FieldSet>,
    /// Owning hierarchy.
    pub hierarchy: String,
}

#[derive(Clone)]
struct Binding {
    primary: Database,
    replica: Option<Database>,
}

/// Compiled schemas and the database handles they are bound to.
///
/// Built by [`init_tables`] at startup and read-only afterwards; clones share
/// nothing mutable, so a registry can be handed to concurrent tasks freely.
#[derive(Clone, Default)]
pub struct Metadata {
    entities: HashMap<String, Registration>,
    table_owners: HashMap<String, String>,
    bindings: HashMap<String, Binding>,
}

impl Metadata {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether `entity` is registered.
    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Registration of an entity.
    pub fn registration(&self, entity: &str) -> Result<&Registration> {
        self.entities
            .get(entity)
            .ok_or_else(|| Error::Configuration(format!("entity '{}' is not registered", entity)))
    }

    /// Compiled schema of an entity.
    pub fn table(&self, entity: &str) -> Result<Arc<TableSchema>> {
        Ok(self.registration(entity)?.schema.clone())
    }

    /// Compiled schema by physical table name.
    pub fn table_by_name(&self, table_name: &str) -> Option<Arc<TableSchema>> {
        let owner = self.table_owners.get(table_name)?;
        self.entities.get(owner).map(|r| r.schema.clone())
    }

    /// Every registered schema, ordered by table name.
    pub fn tables(&self) -> Vec<Arc<TableSchema>> {
        let mut tables: Vec<_> = self.entities.values().map(|r| r.schema.clone()).collect();
        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        tables
    }

    /// Handle reads of `entity` go to: the replica if bound, else the primary.
    pub fn reader(&self, entity: &str) -> Result<&Database> {
        let binding = self.binding(entity)?;
        Ok(binding.replica.as_ref().unwrap_or(&binding.primary))
    }

    /// Handle writes of `entity` go to.
    pub fn writer(&self, entity: &str) -> Result<&Database> {
        Ok(&self.binding(entity)?.primary)
    }

    /// Persistence gateway for `E`.
    pub fn objects<E: Entity>(&self) -> Manager<'_, E> {
        Manager::new(self)
    }

    fn binding(&self, entity: &str) -> Result<&Binding> {
        let hierarchy = &self.registration(entity)?.hierarchy;
        self.bindings.get(hierarchy).ok_or_else(|| {
            Error::Configuration(format!(
                "hierarchy '{}' of entity '{}' is not bound to a database",
                hierarchy, entity
            ))
        })
    }

    /// Register a compiled entity.
    ///
    /// Registering an identical schema again is a no-op, even from another
    /// hierarchy; the entity stays bound to the hierarchy that registered it
    /// first. Any other clash on the entity name or the table name is a
    /// schema error.
    fn register(&mut self, schema: TableSchema, shape: FieldSet, hierarchy: &str) -> Result<()> {
        if let Some(existing) = self.entities.get(&schema.entity) {
            if existing.schema.fingerprint()? == schema.fingerprint()? {
                if existing.hierarchy != hierarchy {
                    debug!(
                        entity = %schema.entity,
                        owner = %existing.hierarchy,
                        "identical schema already registered"
                    );
                }
                return Ok(());
            }
            return Err(Error::Schema(format!(
                "entity '{}' is already registered with a different schema",
                schema.entity
            )));
        }
        if let Some(owner) = self.table_owners.get(&schema.table_name) {
            return Err(Error::Schema(format!(
                "table '{}' of entity '{}' is already registered by entity '{}'",
                schema.table_name, schema.entity, owner
            )));
        }

        self.table_owners
            .insert(schema.table_name.clone(), schema.entity.clone());
        self.entities.insert(
            schema.entity.clone(),
            Registration {
                schema: Arc::new(schema),
                shape: Arc::new(shape),
                hierarchy: hierarchy.to_string(),
            },
        );
        Ok(())
    }

    /// Every foreign column must reference a registered entity through a
    /// column of the same type as that entity's key.
    fn check_references(&self, schema: &TableSchema) -> Result<()> {
        for column in &schema.columns {
            let target = match &column.kind {
                ColumnKind::Foreign { entity } => entity,
                _ => continue,
            };
            let target_schema = self.table(target).map_err(|_| {
                Error::Configuration(format!(
                    "{}.{} references unregistered entity '{}'",
                    schema.entity, column.field, target
                ))
            })?;
            let key = target_schema.primary_key_column()?;
            if key.column_type != column.column_type {
                return Err(Error::Configuration(format!(
                    "{}.{} is stored as {} but {}.{} is {}",
                    schema.entity,
                    column.field,
                    column.column_type,
                    target,
                    key.field,
                    key.column_type
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entities: Vec<_> = self.entities.keys().collect();
        entities.sort();
        f.debug_struct("Metadata")
            .field("entities", &entities)
            .field("hierarchies", &self.bindings.len())
            .finish()
    }
}

/// Compile and register every entity of `hierarchy`, bind the hierarchy to
/// `primary` (and `replica` for reads), and create its tables on the primary.
///
/// Pass the registry returned by an earlier call as `metadata` to let several
/// hierarchies share it; the merge happens on a copy, so a failed call leaves
/// that registry untouched. Calling again with the same hierarchy and handles
/// is harmless.
#[instrument(skip_all, fields(hierarchy = %hierarchy.name()))]
pub async fn init_tables(
    hierarchy: &Hierarchy,
    primary: Database,
    replica: Option<Database>,
    metadata: Option<&Metadata>,
) -> Result<Metadata> {
    let mut metadata = metadata.cloned().unwrap_or_default();

    let mut compiled = Vec::with_capacity(hierarchy.members.len());
    for member in &hierarchy.members {
        let decl = (member.declare)();
        if decl.name() != member.name {
            return Err(Error::Configuration(format!(
                "entity '{}' declares itself as '{}'",
                member.name,
                decl.name()
            )));
        }
        if decl.convention != hierarchy.convention {
            return Err(Error::Configuration(format!(
                "entity '{}' uses the {:?} convention but hierarchy '{}' is {:?}",
                member.name, decl.convention, hierarchy.name, hierarchy.convention
            )));
        }
        compiled.push((compile(&decl)?, decl.shape));
    }

    let mut schemas = Vec::with_capacity(compiled.len());
    for (schema, shape) in compiled {
        let entity = schema.entity.clone();
        metadata.register(schema, shape, &hierarchy.name)?;
        schemas.push(metadata.registration(&entity)?.clone());
    }
    for registration in &schemas {
        metadata.check_references(&registration.schema)?;
    }
    // entities owned by an earlier hierarchy keep their tables where they are
    let schemas: Vec<Arc<TableSchema>> = schemas
        .into_iter()
        .filter(|r| r.hierarchy == hierarchy.name)
        .map(|r| r.schema)
        .collect();

    metadata.bindings.insert(
        hierarchy.name.clone(),
        Binding {
            primary: primary.clone(),
            replica: replica.clone(),
        },
    );

    for schema in schemas {
        info!(entity = %schema.entity, table = %schema.table_name, "registering table");
        primary.execute(schema, Operation::CreateTable).await?;
    }

    info!(
        primary = %primary.name(),
        replica = replica.as_ref().map(|r| r.name()).unwrap_or("-"),
        entities = hierarchy.members.len(),
        "hierarchy bound"
    );
    Ok(metadata)
}
