//! Per-field storage attributes ("table config").

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::types::ScalarType;
use crate::value::Value;

/// A named zero-argument value producer (e.g. "now").
///
/// Producers compare and serialize by name, which keeps compiled schemas
/// comparable.
#[derive(Clone)]
pub struct ValueProducer {
    name: String,
    produce: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl ValueProducer {
    /// Create a producer.
    pub fn new<F>(name: impl Into<String>, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            produce: Arc::new(produce),
        }
    }

    /// Current timestamp.
    pub fn now() -> Self {
        Self::new("now", Value::now)
    }

    /// Producer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the producer.
    pub fn produce(&self) -> Value {
        (self.produce)()
    }
}

impl PartialEq for ValueProducer {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for ValueProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueProducer({})", self.name)
    }
}

impl Serialize for ValueProducer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// Insert-time default for a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefaultValue {
    /// Fixed value.
    Static(Value),
    /// Value computed at insert time.
    Producer(ValueProducer),
}

impl DefaultValue {
    /// Evaluate the default.
    pub fn evaluate(&self) -> Value {
        match self {
            DefaultValue::Static(v) => v.clone(),
            DefaultValue::Producer(p) => p.produce(),
        }
    }
}

/// Storage attributes for one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnConfig {
    /// Field is the primary key.
    pub primary_key: bool,
    /// Column is indexed.
    pub index: bool,
    /// Column values must be unique.
    pub unique: bool,
    /// Insert-time default.
    pub default: Option<DefaultValue>,
    /// Update-time producer.
    pub onupdate: Option<ValueProducer>,
    /// Maximum text length.
    pub length: Option<u32>,
    /// Stored scalar type override (foreign keys).
    pub storage_type: Option<ScalarType>,
    /// Store structured values in a native JSON column.
    pub jsonb: bool,
    /// Physical column name override.
    pub name: Option<String>,
}

impl ColumnConfig {
    /// Empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as indexed.
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Static insert-time default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Computed insert-time default.
    pub fn default_with(mut self, producer: ValueProducer) -> Self {
        self.default = Some(DefaultValue::Producer(producer));
        self
    }

    /// Producer evaluated on every update.
    pub fn onupdate(mut self, producer: ValueProducer) -> Self {
        self.onupdate = Some(producer);
        self
    }

    /// Maximum text length.
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Stored scalar type.
    pub fn storage_type(mut self, scalar: ScalarType) -> Self {
        self.storage_type = Some(scalar);
        self
    }

    /// Native JSON storage.
    pub fn jsonb(mut self) -> Self {
        self.jsonb = true;
        self
    }

    /// Physical column name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
