//! ormkit: declare entities once, persist and query them asynchronously,
//! and materialize computed views through a cache store.
//!
//! # Quick Start
//!
//! ```ignore
//! use ormkit::{init_tables, Database, Hierarchy, StorageEngine, StorageConfig};
//!
//! let engine = Arc::new(StorageEngine::open(StorageConfig::new("./data"))?);
//! let base = Hierarchy::standard("Base").entity::<User>().entity::<PhoneNumber>();
//! let metadata = init_tables(&base, Database::sled("primary", engine), None, None).await?;
//!
//! let numbers = metadata
//!     .objects::<PhoneNumber>()
//!     .filter("user__email", "a@b.com")?
//!     .all()
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod database;
pub mod entity;
pub mod manager;
pub mod metadata;

pub use cache::{CacheStore, CacheView, MemoryCacheStore, ViewCache};
pub use config::{CacheConfig, PoolConfig};
pub use database::{Database, Driver, SledDriver};
pub use entity::Entity;
pub use manager::{Manager, QuerySet};
pub use metadata::{init_tables, Hierarchy, Metadata, Registration};

pub use ormkit_core::*;
