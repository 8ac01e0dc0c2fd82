//! Reference storage engine.
//!
//! A sled-backed relational store that executes [`Operation`](crate::query::Operation)s
//! against compiled table schemas. Drivers wrap it; tests and the CLI use it directly.

mod config;
mod engine;
mod record;

pub mod key;

pub use config::StorageConfig;
pub use engine::{StorageEngine, TableInfo};
pub use record::Record;
