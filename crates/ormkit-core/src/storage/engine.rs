//! Storage engine implementation.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use sled::{Db, Tree};
use tracing::{debug, info};

use super::key::{decode_primary_key, encode_primary_key, index_key, index_prefix};
use super::{Record, StorageConfig};
use crate::catalog::{ColumnDef, TableSchema};
use crate::error::{Error, Result};
use crate::query::{Operation, Outcome, Select};
use crate::row::Row;
use crate::value::Value;

/// Tree name for table metadata.
const META_TREE: &str = "meta";

/// Prefix for serialized schemas in the meta tree.
const SCHEMA_PREFIX: &str = "schema:";

/// Prefix for auto-increment counters in the meta tree.
const SEQUENCE_PREFIX: &str = "seq:";

/// A table's serialized schema, as registered.
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// Physical table name.
    pub table_name: String,
    /// Schema as registered, in its serialized form.
    pub schema: serde_json::Value,
    /// Number of stored rows.
    pub rows: usize,
}

/// A sled-backed relational store.
///
/// Each table gets a data tree (`data:{table}`, primary key to [`Record`]) and
/// an index tree (`index:{table}`) holding entries for indexed and unique
/// columns. Writes are serialized by a single lock so that index maintenance
/// and uniqueness checks see a consistent view; reads take no lock.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Tree for schemas and sequences.
    meta_tree: Tree,

    /// Serializes writers.
    write_lock: Mutex<()>,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self> {
        let db = config.to_sled_config().open()?;
        let meta_tree = db.open_tree(META_TREE)?;
        info!(path = %config.path.display(), temporary = config.temporary, "storage engine opened");

        Ok(Self {
            db,
            meta_tree,
            write_lock: Mutex::new(()),
        })
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Execute one operation against `table`.
    pub fn execute(&self, table: &TableSchema, op: Operation) -> Result<Outcome> {
        debug!(table = %table.table_name, op = op.kind(), "executing");
        match op {
            Operation::CreateTable => self.create_table(table).map(|_| Outcome::Created),
            Operation::Insert(row) => self.insert(table, row).map(Outcome::Inserted),
            Operation::Update { key, row } => self.update(table, &key, row).map(Outcome::Updated),
            Operation::Delete { key } => self.delete(table, &key).map(Outcome::Deleted),
            Operation::Select(select) => self.select(table, &select).map(Outcome::Rows),
        }
    }

    /// Register a table; existing rows are kept.
    pub fn create_table(&self, table: &TableSchema) -> Result<()> {
        let _guard = self.write_lock.lock();
        let bytes = table.to_bytes()?;
        let key = format!("{}{}", SCHEMA_PREFIX, table.table_name);

        let previous = self.meta_tree.insert(key.as_bytes(), bytes.as_slice())?;
        self.data_tree(&table.table_name)?;
        self.index_tree(&table.table_name)?;

        match previous {
            Some(old) if &old[..] != bytes.as_slice() => {
                info!(table = %table.table_name, "table schema replaced")
            }
            Some(_) => debug!(table = %table.table_name, "table already registered"),
            None => info!(table = %table.table_name, "table created"),
        }
        Ok(())
    }

    /// Insert a column-keyed row and return it as stored.
    pub fn insert(&self, table: &TableSchema, mut row: Row) -> Result<Row> {
        let _guard = self.write_lock.lock();
        let pk = table.primary_key_column()?;
        let data = self.data_tree(&table.table_name)?;
        let index = self.index_tree(&table.table_name)?;

        if row.is_unset(&pk.name) {
            if !pk.autoincrement {
                return Err(Error::Constraint(format!(
                    "{}: primary key '{}' must be set",
                    table.table_name, pk.name
                )));
            }
            let next = self.next_sequence(&table.table_name, &data)?;
            row.set(pk.name.clone(), Value::Int(next));
        }

        let key_value = row.get(&pk.name).cloned().unwrap_or_default();
        let key = encode_primary_key(&key_value)?;
        if data.contains_key(&key)? {
            return Err(Error::Constraint(format!(
                "{}: duplicate primary key {}",
                table.table_name, key_value
            )));
        }
        self.check_unique(table, &index, &row, None)?;

        let record = Record::new(row.to_bytes()?);
        data.insert(&key, record.to_bytes()?)?;
        self.write_index(table, &index, &row, &key)?;

        if let Value::Int(assigned) = key_value {
            self.bump_sequence(&table.table_name, assigned)?;
        }

        debug!(table = %table.table_name, key = %key_value, "row inserted");
        Ok(row)
    }

    /// Replace the row stored under `key`.
    pub fn update(&self, table: &TableSchema, key_value: &Value, mut row: Row) -> Result<Row> {
        let _guard = self.write_lock.lock();
        let pk = table.primary_key_column()?;
        let data = self.data_tree(&table.table_name)?;
        let index = self.index_tree(&table.table_name)?;

        match row.get(&pk.name) {
            Some(v) if !v.is_null() && !v.loose_eq(key_value) => {
                return Err(Error::Constraint(format!(
                    "{}: primary key cannot change ({} -> {})",
                    table.table_name, key_value, v
                )));
            }
            _ => row.set(pk.name.clone(), key_value.clone()),
        }

        let key = encode_primary_key(key_value)?;
        let existing = match data.get(&key)? {
            Some(bytes) => Record::from_bytes(&bytes)?,
            None => {
                return Err(Error::NotFound {
                    entity: table.entity.clone(),
                })
            }
        };
        let old_row = Row::from_bytes(&existing.data)?;
        self.check_unique(table, &index, &row, Some(key.as_slice()))?;

        self.clear_index(table, &index, &old_row, &key)?;
        data.insert(&key, existing.rewrite(row.to_bytes()?).to_bytes()?)?;
        self.write_index(table, &index, &row, &key)?;

        debug!(table = %table.table_name, key = %key_value, "row updated");
        Ok(row)
    }

    /// Delete the row stored under `key`; returns whether one existed.
    pub fn delete(&self, table: &TableSchema, key_value: &Value) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let data = self.data_tree(&table.table_name)?;
        let index = self.index_tree(&table.table_name)?;
        let key = encode_primary_key(key_value)?;

        match data.remove(&key)? {
            Some(bytes) => {
                let record = Record::from_bytes(&bytes)?;
                let old_row = Row::from_bytes(&record.data)?;
                self.clear_index(table, &index, &old_row, &key)?;
                debug!(table = %table.table_name, key = %key_value, "row deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run a select.
    ///
    /// An equality condition on the primary key or an indexed column narrows
    /// the candidates before the remaining conditions are evaluated.
    pub fn select(&self, table: &TableSchema, select: &Select) -> Result<Vec<Row>> {
        let data = self.data_tree(&table.table_name)?;

        let rows = match self.candidate_keys(table, select)? {
            Some(keys) => {
                let mut rows = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(bytes) = data.get(&key)? {
                        rows.push(Row::from_bytes(&Record::from_bytes(&bytes)?.data)?);
                    }
                }
                rows
            }
            None => Self::decode_all(&data)?,
        };

        let matched = rows.into_iter().filter(|row| select.matches(row)).collect();
        Ok(select.finish(matched))
    }

    /// Every stored row of a table, in primary-key order.
    pub fn scan(&self, table_name: &str) -> Result<Vec<Row>> {
        Self::decode_all(&self.data_tree(table_name)?)
    }

    /// Registered tables, ordered by name.
    pub fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let mut tables = Vec::new();
        for entry in self.meta_tree.scan_prefix(SCHEMA_PREFIX.as_bytes()) {
            let (key, value) = entry?;
            let table_name = String::from_utf8_lossy(&key[SCHEMA_PREFIX.len()..]).into_owned();
            let schema = serde_json::from_slice(&value)?;
            let rows = self.data_tree(&table_name)?.len();
            tables.push(TableInfo {
                table_name,
                schema,
                rows,
            });
        }
        Ok(tables)
    }

    /// A single registered table.
    pub fn table_info(&self, table_name: &str) -> Result<Option<TableInfo>> {
        Ok(self
            .list_tables()?
            .into_iter()
            .find(|t| t.table_name == table_name))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn data_tree(&self, table_name: &str) -> Result<Tree> {
        Ok(self.db.open_tree(format!("data:{}", table_name))?)
    }

    fn index_tree(&self, table_name: &str) -> Result<Tree> {
        Ok(self.db.open_tree(format!("index:{}", table_name))?)
    }

    fn decode_all(data: &Tree) -> Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(data.len());
        for entry in data.iter() {
            let (_, bytes) = entry?;
            rows.push(Row::from_bytes(&Record::from_bytes(&bytes)?.data)?);
        }
        Ok(rows)
    }

    /// Encoded primary keys an equality condition restricts the select to, if any.
    fn candidate_keys(&self, table: &TableSchema, select: &Select) -> Result<Option<Vec<Vec<u8>>>> {
        let pk = table.primary_key_column()?;

        for condition in &select.conditions {
            let values = match condition.equality_values() {
                Some(values) => values,
                None => continue,
            };

            if condition.column() == pk.name {
                // an operand with no key encoding leaves this condition to the scan
                let keys: Option<BTreeSet<Vec<u8>>> = values
                    .into_iter()
                    .map(|v| encode_primary_key(&key_operand(v)).ok())
                    .collect();
                match keys {
                    Some(keys) => return Ok(Some(keys.into_iter().collect())),
                    None => continue,
                }
            }

            let indexed = table
                .column_by_name(condition.column())
                .map(ColumnDef::needs_index)
                .unwrap_or(false);
            if indexed {
                let index = self.index_tree(&table.table_name)?;
                let mut keys = BTreeSet::new();
                for value in values {
                    for entry in index.scan_prefix(index_prefix(condition.column(), value)) {
                        let (_, pk_bytes) = entry?;
                        keys.insert(pk_bytes.to_vec());
                    }
                }
                return Ok(Some(keys.into_iter().collect()));
            }
        }

        Ok(None)
    }

    fn check_unique(
        &self,
        table: &TableSchema,
        index: &Tree,
        row: &Row,
        own_key: Option<&[u8]>,
    ) -> Result<()> {
        for column in table.unique_columns() {
            let value = match row.get(&column.name) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            for entry in index.scan_prefix(index_prefix(&column.name, value)) {
                let (_, holder) = entry?;
                if own_key != Some(&holder[..]) {
                    return Err(Error::Constraint(format!(
                        "{}: duplicate value {} for unique column '{}'",
                        table.table_name, value, column.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn write_index(&self, table: &TableSchema, index: &Tree, row: &Row, key: &[u8]) -> Result<()> {
        for column in table.indexed_columns() {
            if let Some(value) = row.get(&column.name).filter(|v| !v.is_null()) {
                index.insert(index_key(&column.name, value, key), key)?;
            }
        }
        Ok(())
    }

    fn clear_index(&self, table: &TableSchema, index: &Tree, row: &Row, key: &[u8]) -> Result<()> {
        for column in table.indexed_columns() {
            if let Some(value) = row.get(&column.name).filter(|v| !v.is_null()) {
                index.remove(index_key(&column.name, value, key))?;
            }
        }
        Ok(())
    }

    /// Next auto-increment value: past both the stored counter and the largest key.
    fn next_sequence(&self, table_name: &str, data: &Tree) -> Result<i64> {
        let counter = self.read_sequence(table_name)?;
        let largest = match data.last()? {
            Some((key, _)) => decode_primary_key(&key)?.as_i64().unwrap_or(0),
            None => 0,
        };
        counter
            .max(largest)
            .checked_add(1)
            .ok_or_else(|| Error::Constraint(format!("{}: sequence exhausted", table_name)))
    }

    fn bump_sequence(&self, table_name: &str, assigned: i64) -> Result<()> {
        if assigned > self.read_sequence(table_name)? {
            let key = format!("{}{}", SEQUENCE_PREFIX, table_name);
            self.meta_tree
                .insert(key.as_bytes(), assigned.to_be_bytes().to_vec())?;
        }
        Ok(())
    }

    fn read_sequence(&self, table_name: &str) -> Result<i64> {
        let key = format!("{}{}", SEQUENCE_PREFIX, table_name);
        match self.meta_tree.get(key.as_bytes())? {
            Some(bytes) if bytes.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(i64::from_be_bytes(raw))
            }
            Some(_) => Err(Error::InvalidData(format!(
                "corrupt sequence for table '{}'",
                table_name
            ))),
            None => Ok(0),
        }
    }
}

/// Integral floats address the same key as the equal integer.
fn key_operand(value: &Value) -> Value {
    match value {
        Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
            Value::Int(*f as i64)
        }
        other => other.clone(),
    }
}
