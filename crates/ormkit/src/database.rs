//! Database handles, the driver seam, and the sled-backed driver.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use ormkit_core::{Error, Operation, Outcome, Result, StorageConfig, StorageEngine, TableSchema};

use crate::config::PoolConfig;

/// A relational store driver.
///
/// Drivers execute one [`Operation`] against one table and own whatever
/// connection or engine state that requires.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute `op` against `table`.
    async fn execute(&self, table: Arc<TableSchema>, op: Operation) -> Result<Outcome>;
}

/// Driver over the reference [`StorageEngine`].
///
/// Engine calls block, so each one runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SledDriver {
    engine: Arc<StorageEngine>,
}

impl SledDriver {
    /// Wrap an open engine.
    pub fn new(engine: Arc<StorageEngine>) -> Self {
        Self { engine }
    }

    /// Open an engine with `config` and wrap it.
    pub fn open(config: StorageConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(StorageEngine::open(config)?)))
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<StorageEngine> {
        &self.engine
    }
}

#[async_trait]
impl Driver for SledDriver {
    async fn execute(&self, table: Arc<TableSchema>, op: Operation) -> Result<Outcome> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.execute(&table, op))
            .await
            .map_err(|e| Error::Storage(format!("task join failed: {}", e)))?
    }
}

static NEXT_DATABASE_ID: AtomicU64 = AtomicU64::new(1);

struct DatabaseInner {
    id: u64,
    name: String,
    driver: Arc<dyn Driver>,
    pool: Arc<Semaphore>,
    config: PoolConfig,
}

/// A pooled handle to one relational store.
///
/// Handles are cheap to clone; clones share the pool and the identity used
/// for primary/replica routing. At most `max_connections` operations run at
/// once; further callers wait up to `acquire_timeout`. The connection is
/// held by the operation, not the caller: an abandoned call still runs to
/// completion and gives the connection back when it finishes.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Create a handle over a driver.
    pub fn new(name: impl Into<String>, driver: impl Driver + 'static, config: PoolConfig) -> Self {
        Self::with_driver(name, Arc::new(driver), config)
    }

    /// Create a handle over a shared driver.
    pub fn with_driver(name: impl Into<String>, driver: Arc<dyn Driver>, config: PoolConfig) -> Self {
        let pool = Arc::new(Semaphore::new(config.max_connections));
        Self {
            inner: Arc::new(DatabaseInner {
                id: NEXT_DATABASE_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                driver,
                pool,
                config,
            }),
        }
    }

    /// Handle over a sled engine with the default pool.
    pub fn sled(name: impl Into<String>, engine: Arc<StorageEngine>) -> Self {
        Self::new(name, SledDriver::new(engine), PoolConfig::default())
    }

    /// Process-unique handle identity.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Handle name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Pool configuration.
    pub fn pool_config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Connections not currently in use.
    pub fn available_connections(&self) -> usize {
        self.inner.pool.available_permits()
    }

    /// Whether two handles are the same database.
    pub fn same_as(&self, other: &Database) -> bool {
        self.inner.id == other.inner.id
    }

    /// Execute an operation on a pooled connection.
    pub async fn execute(&self, table: Arc<TableSchema>, op: Operation) -> Result<Outcome> {
        let timeout = self.inner.config.acquire_timeout;
        let permit = tokio::time::timeout(timeout, self.inner.pool.clone().acquire_owned())
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "{}: no connection available within {:?}",
                    self.inner.name, timeout
                ))
            })?
            .map_err(|e| Error::Pool(e.to_string()))?;

        debug!(
            database = %self.inner.name,
            table = %table.table_name,
            op = op.kind(),
            "executing"
        );
        let driver = self.inner.driver.clone();
        tokio::spawn(async move {
            let _permit = permit;
            driver.execute(table, op).await
        })
        .await
        .map_err(|e| Error::Storage(format!("task join failed: {}", e)))?
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("max_connections", &self.inner.config.max_connections)
            .finish_non_exhaustive()
    }
}
