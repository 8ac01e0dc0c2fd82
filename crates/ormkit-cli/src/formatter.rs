//! Output formatters for inspection results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use ormkit_core::{ColumnType, Row, TableInfo, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// One column of a registered schema, as shown by `describe`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub field: String,
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub flags: Vec<&'static str>,
}

impl ColumnSummary {
    /// Read the columns out of a serialized table schema.
    pub fn from_schema(schema: &serde_json::Value) -> Result<Vec<Self>, String> {
        let columns = schema["columns"]
            .as_array()
            .ok_or_else(|| "missing column list".to_string())?;

        columns
            .iter()
            .map(|col| {
                let column_type: ColumnType = serde_json::from_value(col["column_type"].clone())
                    .map_err(|e| e.to_string())?;
                let flag = |key: &str| col[key].as_bool().unwrap_or(false);

                let mut flags = Vec::new();
                if flag("primary_key") {
                    flags.push("pk");
                }
                if flag("autoincrement") {
                    flags.push("auto");
                }
                if flag("unique") {
                    flags.push("unique");
                }
                if flag("indexed") {
                    flags.push("index");
                }
                if col["kind"].get("Foreign").is_some() {
                    flags.push("fk");
                }
                if !col["default"].is_null() {
                    flags.push("default");
                }
                if !col["onupdate"].is_null() {
                    flags.push("onupdate");
                }

                Ok(Self {
                    field: col["field"].as_str().unwrap_or_default().to_string(),
                    name: col["name"].as_str().unwrap_or_default().to_string(),
                    column_type: column_type.to_string(),
                    nullable: flag("nullable"),
                    flags,
                })
            })
            .collect()
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format the table listing.
    fn format_tables(&self, tables: &[TableInfo]) -> String;

    /// Format the columns of one table.
    fn format_columns(&self, table: &str, columns: &[ColumnSummary]) -> String;

    /// Format stored rows.
    fn format_rows(&self, rows: &[Row]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_tables(&self, tables: &[TableInfo]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Table", "Entity", "Rows"]);

        for info in tables {
            table.add_row(vec![
                Cell::new(&info.table_name),
                Cell::new(info.schema["entity"].as_str().unwrap_or("?")),
                Cell::new(info.rows),
            ]);
        }

        table.to_string()
    }

    fn format_columns(&self, name: &str, columns: &[ColumnSummary]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Column", "Type", "Null", "Attributes"]);

        for col in columns {
            table.add_row(vec![
                Cell::new(&col.field),
                Cell::new(&col.name),
                Cell::new(&col.column_type),
                Cell::new(if col.nullable { "YES" } else { "NO" }),
                Cell::new(col.flags.join(" ")),
            ]);
        }

        format!("{}\n{}", name, table)
    }

    fn format_rows(&self, rows: &[Row]) -> String {
        let Some(first) = rows.first() else {
            return "No results".to_string();
        };

        let mut table = Table::new();
        table.set_header(first.names().map(Cell::new).collect::<Vec<_>>());
        for row in rows {
            table.add_row(row.iter().map(|(_, v)| Cell::new(v)).collect::<Vec<_>>());
        }

        format!("{}\n{} row(s)", table, rows.len())
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_tables(&self, tables: &[TableInfo]) -> String {
        let items: Vec<serde_json::Value> = tables
            .iter()
            .map(|info| {
                serde_json::json!({
                    "table": info.table_name,
                    "entity": info.schema["entity"],
                    "rows": info.rows,
                })
            })
            .collect();
        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_columns(&self, name: &str, columns: &[ColumnSummary]) -> String {
        let items: Vec<serde_json::Value> = columns
            .iter()
            .map(|col| {
                serde_json::json!({
                    "field": col.field,
                    "column": col.name,
                    "type": col.column_type,
                    "nullable": col.nullable,
                    "attributes": col.flags,
                })
            })
            .collect();
        serde_json::to_string_pretty(&serde_json::json!({ "table": name, "columns": items }))
            .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_rows(&self, rows: &[Row]) -> String {
        let items: Vec<serde_json::Value> = rows.iter().map(Row::to_plain_json).collect();
        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_tables(&self, tables: &[TableInfo]) -> String {
        let mut output = String::from("table,rows\n");
        for info in tables {
            output.push_str(&format!("{},{}\n", info.table_name, info.rows));
        }
        output
    }

    fn format_columns(&self, _name: &str, columns: &[ColumnSummary]) -> String {
        let mut output = String::from("field,column,type,nullable,attributes\n");
        for col in columns {
            output.push_str(&format!(
                "{},{},\"{}\",{},{}\n",
                col.field,
                col.name,
                col.column_type,
                col.nullable,
                col.flags.join(" ")
            ));
        }
        output
    }

    fn format_rows(&self, rows: &[Row]) -> String {
        let Some(first) = rows.first() else {
            return String::new();
        };

        let mut output = first.names().collect::<Vec<_>>().join(",");
        output.push('\n');
        for row in rows {
            let cells: Vec<String> = row.iter().map(|(_, v)| format_value_csv(v)).collect();
            output.push_str(&cells.join(","));
            output.push('\n');
        }
        output
    }
}

/// Format a Value for CSV output.
fn format_value_csv(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => format!("\"{}\"", escape_csv(s)),
        Value::Json(j) => format!("\"{}\"", escape_csv(&j.to_string())),
        other => other.to_string(),
    }
}

/// Escape a string for CSV.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
