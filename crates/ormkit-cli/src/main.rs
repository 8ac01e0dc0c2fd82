//! ormkit command-line inspector
//!
//! Lists, describes and dumps the tables stored in an ormkit data directory.

mod commands;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;

/// ormkit data directory inspector
#[derive(Parser, Debug)]
#[command(name = "ormkit")]
#[command(version, about = "Inspect ormkit data directories")]
pub struct Args {
    /// Data directory of the storage engine
    #[arg(short = 'd', long, default_value = "./data")]
    pub data: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered tables with their row counts
    Tables,
    /// Show the compiled columns of a table
    Describe {
        /// Physical table name
        table: String,
    },
    /// Print the stored rows of a table
    Dump {
        /// Physical table name
        table: String,
        /// Print at most this many rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ormkit=info")),
        )
        .init();

    let args = Args::parse();

    match commands::run(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
