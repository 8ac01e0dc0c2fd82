//! Record type for stored rows.

use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};

/// A stored row with write timestamps.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Serialized column-keyed row.
    pub data: Vec<u8>,

    /// Insert timestamp in microseconds since Unix epoch.
    pub created_at: u64,

    /// Last write timestamp in microseconds since Unix epoch.
    pub updated_at: u64,
}

impl Record {
    /// Create a new record with the current timestamp.
    pub fn new(data: Vec<u8>) -> Self {
        let now = super::key::current_timestamp();
        Self {
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the payload, keeping the creation time.
    pub fn rewrite(&self, data: Vec<u8>) -> Self {
        Self {
            data,
            created_at: self.created_at,
            updated_at: super::key::current_timestamp(),
        }
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
