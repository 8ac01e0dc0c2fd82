//! Operations a driver executes against one table, and their outcomes.

use std::cmp::Ordering;

use super::filter::{matches_all, Condition};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// Sort key on a physical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to sort by.
    pub column: String,
    /// Descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// Split `"-field"` / `"field"` into the name and direction.
    pub fn parse_spec(spec: &str) -> (&str, bool) {
        match spec.strip_prefix('-') {
            Some(name) => (name, true),
            None => (spec, false),
        }
    }
}

/// A filtered, ordered, limited read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    /// Conjunction of conditions.
    pub conditions: Vec<Condition>,
    /// Sort keys, most significant first.
    pub order_by: Vec<OrderBy>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl Select {
    /// Select every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a sort key.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Cap the number of rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every condition.
    pub fn matches(&self, row: &Row) -> bool {
        matches_all(&self.conditions, row)
    }

    /// Sort and truncate matched rows. Nulls sort first; the sort is stable.
    pub fn finish(&self, mut rows: Vec<Row>) -> Vec<Row> {
        if !self.order_by.is_empty() {
            rows.sort_by(|a, b| {
                for key in &self.order_by {
                    let left = a.get(&key.column).unwrap_or(&Value::Null);
                    let right = b.get(&key.column).unwrap_or(&Value::Null);
                    let ord = compare_for_sort(left, right);
                    let ord = if key.descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

fn compare_for_sort(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

/// A single unit of work against one table.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create the table and its indexes if absent.
    CreateTable,
    /// Insert a column-keyed row; the stored row is returned.
    Insert(Row),
    /// Replace the row with primary key `key`.
    Update {
        /// Primary-key value.
        key: Value,
        /// Full column-keyed row.
        row: Row,
    },
    /// Delete the row with primary key `key`.
    Delete {
        /// Primary-key value.
        key: Value,
    },
    /// Read rows.
    Select(Select),
}

impl Operation {
    /// Whether the operation only reads.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Operation::Select(_))
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateTable => "create_table",
            Operation::Insert(_) => "insert",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::Select(_) => "select",
        }
    }
}

/// Result of executing an [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Table created (or already present).
    Created,
    /// Row inserted, as stored.
    Inserted(Row),
    /// Row updated, as stored.
    Updated(Row),
    /// Whether a row was deleted.
    Deleted(bool),
    /// Selected rows.
    Rows(Vec<Row>),
}

impl Outcome {
    /// Rows of a `Select`.
    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            Outcome::Rows(rows) => Ok(rows),
            other => Err(unexpected("rows", &other)),
        }
    }

    /// Row written by an `Insert` or `Update`.
    pub fn into_row(self) -> Result<Row> {
        match self {
            Outcome::Inserted(row) | Outcome::Updated(row) => Ok(row),
            other => Err(unexpected("a written row", &other)),
        }
    }

    /// Flag of a `Delete`.
    pub fn into_deleted(self) -> Result<bool> {
        match self {
            Outcome::Deleted(deleted) => Ok(deleted),
            other => Err(unexpected("a delete flag", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Outcome) -> Error {
    Error::Storage(format!("driver returned {:?}, expected {}", got, expected))
}
