//! Core error types.

use thiserror::Error;

/// Result alias used across ormkit.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by declaration, compilation, validation, and storage.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed declaration (missing foreign-key mapping, unknown field, bad lookup path).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Primary-key or table-name problem detected while compiling or registering.
    #[error("schema error: {0}")]
    Schema(String),

    /// A field failed normalization or its scalar contract.
    #[error("validation error on {entity}.{field}: {reason}")]
    Validation {
        /// Entity or view being constructed.
        entity: String,
        /// Offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A `get` matched no rows.
    #[error("{entity} matching query does not exist")]
    NotFound {
        /// Entity that was queried.
        entity: String,
    },

    /// A `get` matched more than one row.
    #[error("get() returned {count} {entity} rows, expected exactly one")]
    MultipleResults {
        /// Entity that was queried.
        entity: String,
        /// Number of matching rows.
        count: usize,
    },

    /// Underlying store or cache failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unique or primary-key constraint violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Value of the wrong shape for the requested conversion.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Timed out waiting for a pooled connection.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Connection pool failure.
    #[error("pool error: {0}")]
    Pool(String),
}

impl Error {
    /// Build a validation error.
    pub fn validation(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Validation {
            entity: entity.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is the recoverable "no rows" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Serialization(e.to_string())
        } else {
            Error::Deserialization(e.to_string())
        }
    }
}
