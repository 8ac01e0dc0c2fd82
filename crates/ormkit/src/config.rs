//! Pool and cache configuration.

use std::time::Duration;

/// Default maximum number of concurrent operations per database handle.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Default time to wait for a free connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a database handle's connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections allowed.
    pub max_connections: usize,
    /// Timeout for acquiring a connection from the pool.
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    /// Create a pool configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Set the maximum connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the cache-view layer.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Expiry passed to the cache store on every write. `None` leaves
    /// expiry to the store.
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    /// Create a configuration without expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time-to-live of stored views.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}
