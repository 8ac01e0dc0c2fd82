//! Computed views materialized through a cache store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use ormkit_core::{compile_view, validate, Error, Result, Row, Value, ViewDecl, ViewSchema};

use super::store::CacheStore;
use crate::config::CacheConfig;
use crate::metadata::Metadata;

/// A read-only shape assembled from persisted entities, keyed by an
/// arbitrary field rather than a primary key.
#[async_trait]
pub trait CacheView: Sized + Send + Sync + 'static {
    /// View name; must match the declaration's name.
    const NAME: &'static str;

    /// Declare fields, hooks, cache key and cache field.
    fn declaration() -> ViewDecl;

    /// Load the raw field values for `key` through the persistence gateway.
    async fn get_data(key: &str, metadata: &Metadata) -> Result<Row>;

    /// Build an instance from a validated row.
    fn from_row(row: Row) -> Result<Self>;

    /// Field-keyed row of the instance.
    fn to_row(&self) -> Row;
}

/// Resolves views: cache hit first, loader on miss.
///
/// Concurrent misses for one key are not coalesced; each runs the loader and
/// the last write wins.
pub struct ViewCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    schemas: DashMap<&'static str, Arc<ViewSchema>>,
}

impl ViewCache {
    /// Create a view cache over a store.
    pub fn new(store: impl CacheStore + 'static, config: CacheConfig) -> Self {
        Self::with_store(Arc::new(store), config)
    }

    /// Create a view cache over a shared store.
    pub fn with_store(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            schemas: DashMap::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Compiled schema of `V`, compiled once per cache.
    pub fn schema<V: CacheView>(&self) -> Result<Arc<ViewSchema>> {
        if let Some(schema) = self.schemas.get(V::NAME) {
            return Ok(schema.clone());
        }

        let decl = V::declaration();
        if decl.name() != V::NAME {
            return Err(Error::Configuration(format!(
                "view '{}' declares itself as '{}'",
                V::NAME,
                decl.name()
            )));
        }
        let schema = Arc::new(compile_view(&decl)?);
        self.schemas.insert(V::NAME, schema.clone());
        Ok(schema)
    }

    /// Stored value for `key`, loading and storing it on a miss.
    #[instrument(skip(self, metadata), fields(view = V::NAME))]
    pub async fn resolve<V: CacheView>(&self, metadata: &Metadata, key: &str) -> Result<V> {
        let schema = self.schema::<V>()?;
        let storage_key = schema.storage_key(key);

        if let Some(bytes) = self.store.get(&storage_key).await? {
            debug!(key = %storage_key, "cache hit");
            return V::from_row(Row::from_bytes(&bytes)?);
        }

        debug!(key = %storage_key, "cache miss");
        self.load::<V>(&schema, metadata, key).await
    }

    /// Reload `key` from the store and overwrite the cached value.
    #[instrument(skip(self, metadata), fields(view = V::NAME))]
    pub async fn refresh<V: CacheView>(&self, metadata: &Metadata, key: &str) -> Result<V> {
        let schema = self.schema::<V>()?;
        self.load::<V>(&schema, metadata, key).await
    }

    /// Resolve using the view's cache field read from `source`.
    pub async fn resolve_for<V: CacheView>(&self, metadata: &Metadata, source: &Row) -> Result<V> {
        let schema = self.schema::<V>()?;
        let key = match source.get(&schema.cache_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Int(i)) => i.to_string(),
            other => {
                return Err(Error::InvalidData(format!(
                    "{}: cache field '{}' must be a string or integer, found {}",
                    V::NAME,
                    schema.cache_field,
                    other.map(Value::type_name).unwrap_or("nothing")
                )))
            }
        };
        self.resolve::<V>(metadata, &key).await
    }

    /// Drop the cached value for `key`.
    pub async fn invalidate<V: CacheView>(&self, key: &str) -> Result<bool> {
        let schema = self.schema::<V>()?;
        self.store.delete(&schema.storage_key(key)).await
    }

    async fn load<V: CacheView>(
        &self,
        schema: &ViewSchema,
        metadata: &Metadata,
        key: &str,
    ) -> Result<V> {
        let raw = V::get_data(key, metadata).await?;
        let row = validate(&schema.shape, raw)?;

        self.store
            .set(&schema.storage_key(key), row.to_bytes()?, self.config.ttl)
            .await?;
        V::from_row(row)
    }
}
