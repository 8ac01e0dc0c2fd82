//! Ordered name/value rows.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// An ordered set of named values.
///
/// Entity-level rows are keyed by field name; storage-level rows are keyed by
/// physical column name. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a value, replacing an existing entry in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Get a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether the row carries an entry for `name` (even a null one).
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    /// Whether `name` is missing or null.
    pub fn is_unset(&self, name: &str) -> bool {
        self.get(name).map(Value::is_null).unwrap_or(true)
    }

    /// Remove and return a value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.values.iter().position(|(n, _)| n == name)?;
        Some(self.values.remove(pos).1)
    }

    /// Typed read of a field; a missing entry reads as null.
    pub fn field<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name).cloned().unwrap_or(Value::Null);
        T::from_value(value)
            .map_err(|e| Error::InvalidData(format!("field '{}': {}", name, e)))
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encode as JSON bytes (variant-tagged, lossless).
    ///
    /// Non-finite floats have no JSON form and are refused.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.check_finite()?;
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from [`Row::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Embed this row as a structured value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.check_finite()?;
        serde_json::to_value(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn check_finite(&self) -> Result<()> {
        match self
            .values
            .iter()
            .find(|(_, v)| matches!(v, Value::Float(f) if !f.is_finite()))
        {
            Some((name, _)) => Err(Error::Serialization(format!(
                "field '{}': non-finite float",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Recover a row embedded with [`Row::to_json`].
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        serde_json::from_value(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Plain JSON object (untagged values), for display.
    pub fn to_plain_json(&self) -> serde_json::Value {
        let map = self
            .values
            .iter()
            .map(|(n, v)| (n.clone(), v.to_plain_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(name, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut row = Row::new().with("a", 1i64).with("b", "x");
        row.set("a", 2i64);

        assert_eq!(row.len(), 2);
        assert_eq!(row.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_unset_and_typed_read() {
        let row = Row::new().with("name", "Ada").with("age", Value::Null);

        assert!(row.is_unset("age"));
        assert!(row.is_unset("missing"));
        assert_eq!(row.field::<String>("name").unwrap(), "Ada");
        assert_eq!(row.field::<Option<i64>>("missing").unwrap(), None);
        assert!(row.field::<i64>("name").is_err());
    }

    #[test]
    fn test_non_finite_float_is_refused() {
        let row = Row::new().with("score", f64::NAN);
        assert!(matches!(row.to_bytes(), Err(Error::Serialization(_))));
        assert!(row.to_json().is_err());

        let row = Row::new().with("score", 0.5);
        assert_eq!(Row::from_bytes(&row.to_bytes().unwrap()).unwrap(), row);
    }

    #[test]
    fn test_json_embedding_keeps_variants() {
        let row = Row::new()
            .with("created", Value::Timestamp(42))
            .with("tags", vec!["a".to_string()]);
        let back = Row::from_json(row.to_json().unwrap()).unwrap();
        assert_eq!(back, row);
    }
}
