//! Command execution against an opened storage engine.

use ormkit_core::{StorageConfig, StorageEngine};
use thiserror::Error;
use tracing::debug;

use crate::formatter::{create_formatter, ColumnSummary};
use crate::{Args, Command};

/// Command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Storage(#[from] ormkit_core::Error),

    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    #[error("schema of table '{table}' is unreadable: {reason}")]
    BadSchema { table: String, reason: String },
}

/// Open the data directory and run the requested command.
pub fn run(args: &Args) -> Result<String, CommandError> {
    let engine = StorageEngine::open(StorageConfig::new(&args.data))?;
    debug!(path = %args.data.display(), "data directory opened");
    execute(&engine, &args.command, args.format)
}

/// Run a command and render its output.
pub fn execute(
    engine: &StorageEngine,
    command: &Command,
    format: crate::formatter::OutputFormat,
) -> Result<String, CommandError> {
    let formatter = create_formatter(format);

    match command {
        Command::Tables => {
            let tables = engine.list_tables()?;
            Ok(formatter.format_tables(&tables))
        }
        Command::Describe { table } => {
            let info = engine
                .table_info(table)?
                .ok_or_else(|| CommandError::UnknownTable(table.clone()))?;
            let columns = ColumnSummary::from_schema(&info.schema).map_err(|reason| {
                CommandError::BadSchema {
                    table: table.clone(),
                    reason,
                }
            })?;
            Ok(formatter.format_columns(&info.table_name, &columns))
        }
        Command::Dump { table, limit } => {
            if engine.table_info(table)?.is_none() {
                return Err(CommandError::UnknownTable(table.clone()));
            }
            let mut rows = engine.scan(table)?;
            if let Some(limit) = limit {
                rows.truncate(*limit);
            }
            Ok(formatter.format_rows(&rows))
        }
    }
}
