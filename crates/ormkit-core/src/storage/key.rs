//! Key encodings for data and index trees.
//!
//! Primary keys are encoded so that byte order matches value order:
//! `[0x01][i64 with the sign bit flipped, big-endian]` for integers and
//! `[0x02][utf-8 bytes]` for strings. A data-tree scan therefore returns rows
//! in primary-key order.
//!
//! Index entries are keyed `[column][0x00][len:u32 BE][value][primary key]`
//! and carry the encoded primary key as their value.

use crate::error::{Error, Result};
use crate::value::Value;

const INT_TAG: u8 = 0x01;
const STRING_TAG: u8 = 0x02;

/// Encode a primary-key value.
pub fn encode_primary_key(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Int(i) => {
            let mut buf = Vec::with_capacity(9);
            buf.push(INT_TAG);
            buf.extend_from_slice(&((*i as u64) ^ (1 << 63)).to_be_bytes());
            Ok(buf)
        }
        Value::String(s) => {
            let mut buf = Vec::with_capacity(1 + s.len());
            buf.push(STRING_TAG);
            buf.extend_from_slice(s.as_bytes());
            Ok(buf)
        }
        other => Err(Error::InvalidData(format!(
            "{} cannot be used as a primary key",
            other.type_name()
        ))),
    }
}

/// Decode a key produced by [`encode_primary_key`].
pub fn decode_primary_key(bytes: &[u8]) -> Result<Value> {
    match bytes.split_first() {
        Some((&INT_TAG, rest)) if rest.len() == 8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(rest);
            Ok(Value::Int((u64::from_be_bytes(raw) ^ (1 << 63)) as i64))
        }
        Some((&STRING_TAG, rest)) => String::from_utf8(rest.to_vec())
            .map(Value::String)
            .map_err(|e| Error::InvalidData(format!("primary key is not utf-8: {}", e))),
        _ => Err(Error::InvalidData("malformed primary key".into())),
    }
}

/// Encode a value for index lookups.
///
/// Integral floats share the integer encoding so that numeric equality and
/// index equality agree.
pub fn encode_index_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    match value {
        Value::Null => buf.push(0x00),
        Value::Bool(b) => {
            buf.push(0x01);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(0x02);
            buf.extend_from_slice(&i.to_be_bytes());
        }
        Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 => {
            buf.push(0x02);
            buf.extend_from_slice(&(*f as i64).to_be_bytes());
        }
        Value::Float(f) => {
            buf.push(0x03);
            buf.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::String(s) => {
            buf.push(0x04);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Timestamp(t) => {
            buf.push(0x05);
            buf.extend_from_slice(&t.to_be_bytes());
        }
        Value::Json(j) => {
            buf.push(0x06);
            buf.extend_from_slice(j.to_string().as_bytes());
        }
    }
    buf
}

/// Prefix shared by every index entry for `column = value`.
pub fn index_prefix(column: &str, value: &Value) -> Vec<u8> {
    let encoded = encode_index_value(value);
    let mut key = Vec::with_capacity(column.len() + 5 + encoded.len());
    key.extend_from_slice(column.as_bytes());
    key.push(0x00);
    key.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
    key.extend_from_slice(&encoded);
    key
}

/// Full index entry key.
pub fn index_key(column: &str, value: &Value, primary_key: &[u8]) -> Vec<u8> {
    let mut key = index_prefix(column, value);
    key.extend_from_slice(primary_key);
    key
}

/// Get the current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp_micros().max(0) as u64
}
