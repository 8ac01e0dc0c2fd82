//! Persistence gateway: CRUD and filtered queries for one entity type.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use ormkit_core::{
    validate, Condition, Error, Lookup, Operation, OrderBy, Result, Row, Select, TableSchema,
    Value,
};

use crate::entity::Entity;
use crate::metadata::{Metadata, Registration};

/// CRUD entry point for `E`, obtained from [`Metadata::objects`].
pub struct Manager<'a, E: Entity> {
    metadata: &'a Metadata,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Manager<'a, E> {
    pub(crate) fn new(metadata: &'a Metadata) -> Self {
        Self {
            metadata,
            _entity: PhantomData,
        }
    }

    fn registration(&self) -> Result<&'a Registration> {
        self.metadata.registration(E::NAME)
    }

    /// Validate raw field values and insert them.
    pub async fn create(&self, raw: Row) -> Result<E> {
        let registration = self.registration()?;
        let row = conform(registration, raw)?;
        self.insert_validated(registration, row).await
    }

    /// Insert an instance; returns it as stored (key and defaults filled in).
    pub async fn insert(&self, entity: &E) -> Result<E> {
        let registration = self.registration()?;
        let row = conform(registration, entity.to_row())?;
        self.insert_validated(registration, row).await
    }

    async fn insert_validated(&self, registration: &Registration, row: Row) -> Result<E> {
        let schema = &registration.schema;
        let mut stored = schema.to_storage(&row);
        schema.apply_insert_defaults(&mut stored);

        let written = self
            .metadata
            .writer(E::NAME)?
            .execute(schema.clone(), Operation::Insert(stored))
            .await?
            .into_row()?;
        E::from_row(schema.from_storage(&written))
    }

    /// Write back every field of a stored instance, refreshing `onupdate` columns.
    pub async fn update(&self, entity: &E) -> Result<E> {
        let registration = self.registration()?;
        let schema = &registration.schema;
        let row = conform(registration, entity.to_row())?;
        let key = primary_key_of::<E>(schema, &row)?;

        let mut stored = schema.to_storage(&row);
        schema.apply_update_producers(&mut stored);

        let written = self
            .metadata
            .writer(E::NAME)?
            .execute(schema.clone(), Operation::Update { key, row: stored })
            .await?
            .into_row()?;
        E::from_row(schema.from_storage(&written))
    }

    /// Delete a stored instance; returns whether a row was removed.
    pub async fn delete(&self, entity: &E) -> Result<bool> {
        let schema = &self.registration()?.schema;
        let key = primary_key_of::<E>(schema, &entity.to_row())?;

        self.metadata
            .writer(E::NAME)?
            .execute(schema.clone(), Operation::Delete { key })
            .await?
            .into_deleted()
    }

    /// Fetch by primary key.
    pub async fn get_pk(&self, key: impl Into<Value>) -> Result<E> {
        let schema = &self.registration()?.schema;
        self.query().filter(&schema.primary_key, key)?.get().await
    }

    /// Follow the foreign field `field` of `entity` to the referenced instance.
    pub async fn related<R: Entity>(&self, entity: &E, field: &str) -> Result<R> {
        let schema = &self.registration()?.schema;
        let edge = schema.relation(field).ok_or_else(|| {
            Error::Configuration(format!("{} has no relation '{}'", E::NAME, field))
        })?;
        if edge.to_entity != R::NAME {
            return Err(Error::Configuration(format!(
                "{}.{} references {}, not {}",
                E::NAME,
                field,
                edge.to_entity,
                R::NAME
            )));
        }

        let key = entity.to_row().get(field).cloned().unwrap_or_default();
        if key.is_null() {
            return Err(Error::NotFound {
                entity: R::NAME.to_string(),
            });
        }
        self.metadata.objects::<R>().get_pk(key).await
    }

    /// Start an unfiltered query.
    pub fn query(&self) -> QuerySet<'a, E> {
        QuerySet::new(self.metadata)
    }

    /// Start a query with one lookup.
    pub fn filter(&self, lookup: &str, value: impl Into<Value>) -> Result<QuerySet<'a, E>> {
        self.query().filter(lookup, value)
    }

    /// Every instance, in primary-key order.
    pub async fn all(&self) -> Result<Vec<E>> {
        self.query().all().await
    }

    /// Number of stored instances.
    pub async fn count(&self) -> Result<usize> {
        self.query().count().await
    }
}

/// Validate a raw row and bring its foreign keys to their stored column types.
fn conform(registration: &Registration, raw: Row) -> Result<Row> {
    let mut row = validate(&registration.shape, raw)?;
    registration.schema.conform_foreign_keys(&mut row)?;
    Ok(row)
}

fn primary_key_of<E: Entity>(schema: &TableSchema, row: &Row) -> Result<Value> {
    match row.get(&schema.primary_key) {
        Some(key) if !key.is_null() => Ok(key.clone()),
        _ => Err(Error::InvalidData(format!(
            "{} has no primary key value; it was never saved",
            E::NAME
        ))),
    }
}

/// One hop across a foreign key: the owner's FK column and the referenced table.
#[derive(Debug, Clone)]
struct Hop {
    column: String,
    target: Arc<TableSchema>,
}

/// A condition, possibly on a table reached through foreign keys.
#[derive(Debug, Clone)]
struct Filter {
    hops: Vec<Hop>,
    condition: Condition,
}

/// A lazily executed, filtered and ordered query over `E`.
///
/// Lookups are resolved against the compiled relationship edges when they are
/// added, so a bad path fails in [`QuerySet::filter`] rather than at execution.
pub struct QuerySet<'a, E: Entity> {
    metadata: &'a Metadata,
    filters: Vec<Filter>,
    order_by: Vec<String>,
    limit: Option<usize>,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Clone for QuerySet<'a, E> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata,
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            _entity: PhantomData,
        }
    }
}

impl<'a, E: Entity> QuerySet<'a, E> {
    fn new(metadata: &'a Metadata) -> Self {
        Self {
            metadata,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            _entity: PhantomData,
        }
    }

    /// Add a `path__to__field__op` lookup.
    pub fn filter(mut self, lookup: &str, value: impl Into<Value>) -> Result<Self> {
        let parsed = Lookup::parse(lookup)?;
        let mut current = self.metadata.table(E::NAME)?;
        let mut hops = Vec::with_capacity(parsed.path.len());

        for segment in &parsed.path {
            let edge = current.relation(segment).ok_or_else(|| {
                Error::Configuration(format!(
                    "cannot resolve '{}': {} has no relation '{}'",
                    lookup, current.entity, segment
                ))
            })?;
            let target = self.metadata.table(&edge.to_entity)?;
            hops.push(Hop {
                column: edge.column.clone(),
                target: target.clone(),
            });
            current = target;
        }

        let column = current
            .column(&parsed.field)
            .or_else(|| current.column_by_name(&parsed.field))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "cannot resolve '{}': {} has no field '{}'",
                    lookup, current.entity, parsed.field
                ))
            })?;
        let condition = Condition::from_lookup(parsed.op, column.name.clone(), value.into())?;

        self.filters.push(Filter { hops, condition });
        Ok(self)
    }

    /// Order by a field; prefix with `-` for descending. Keys accumulate.
    pub fn order_by(mut self, spec: impl Into<String>) -> Self {
        self.order_by.push(spec.into());
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Exactly one match, else `NotFound` or `MultipleResults`.
    pub async fn get(self) -> Result<E> {
        let mut rows = self.fetch().await?;
        match rows.len() {
            0 => Err(Error::NotFound {
                entity: E::NAME.to_string(),
            }),
            1 => E::from_row(rows.remove(0)),
            count => Err(Error::MultipleResults {
                entity: E::NAME.to_string(),
                count,
            }),
        }
    }

    /// First match in query order, if any.
    pub async fn first(self) -> Result<Option<E>> {
        let rows = self.limit(1).fetch().await?;
        rows.into_iter().next().map(E::from_row).transpose()
    }

    /// Every match, in query order.
    pub async fn all(self) -> Result<Vec<E>> {
        self.fetch().await?.into_iter().map(E::from_row).collect()
    }

    /// Number of matches.
    pub async fn count(self) -> Result<usize> {
        Ok(self.fetch().await?.len())
    }

    /// Whether anything matches.
    pub async fn exists(self) -> Result<bool> {
        Ok(!self.limit(1).fetch().await?.is_empty())
    }

    /// Run the query and return field-keyed rows.
    async fn fetch(&self) -> Result<Vec<Row>> {
        let schema = self.metadata.table(E::NAME)?;

        let mut select = Select::all();
        for filter in &self.filters {
            select = select.filter(self.resolve(filter).await?);
        }
        for spec in &self.order_by {
            let (field, descending) = OrderBy::parse_spec(spec);
            let column = schema.column(field).ok_or_else(|| {
                Error::Configuration(format!("cannot order {} by unknown field '{}'", E::NAME, field))
            })?;
            select = select.order_by(OrderBy {
                column: column.name.clone(),
                descending,
            });
        }
        select = select.order_by(OrderBy::asc(schema.primary_key_column()?.name.clone()));
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }

        let rows = self
            .metadata
            .reader(E::NAME)?
            .execute(schema.clone(), Operation::Select(select))
            .await?
            .into_rows()?;
        debug!(entity = E::NAME, rows = rows.len(), "query executed");

        Ok(rows.iter().map(|row| schema.from_storage(row)).collect())
    }

    /// Turn a traversal into a condition on `E`'s own columns.
    ///
    /// The innermost table is queried first; its matching keys become an
    /// `in` condition on the FK column one hop closer to `E`.
    async fn resolve(&self, filter: &Filter) -> Result<Condition> {
        let mut condition = filter.condition.clone();

        for hop in filter.hops.iter().rev() {
            let key_column = hop.target.primary_key_column()?.name.clone();
            let rows = self
                .metadata
                .reader(&hop.target.entity)?
                .execute(
                    hop.target.clone(),
                    Operation::Select(Select::all().filter(condition)),
                )
                .await?
                .into_rows()?;

            let keys: Vec<Value> = rows
                .into_iter()
                .filter_map(|mut row| row.remove(&key_column))
                .collect();
            debug!(
                table = %hop.target.table_name,
                keys = keys.len(),
                "resolved related keys"
            );
            condition = Condition::In {
                column: hop.column.clone(),
                values: keys,
            };
        }

        Ok(condition)
    }
}
