use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dyntable")]
#[command(author, version, about = "Define tabular data models at runtime and read/write rows against them")]
pub struct Cli {
    /// Path to the SQLite database holding the catalog and all dynamic tables
    #[arg(short, long, default_value = "dyntable.db")]
    pub db: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Physical table name prefix
    #[arg(long, default_value = "dyntbl_")]
    pub table_prefix: String,

    /// Maximum length of character columns
    #[arg(long, default_value_t = 255)]
    pub char_length: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a dynamic table from a JSON map of column name to type
    /// (allowed types: "character", "integer", "boolean")
    CreateTable {
        /// e.g. '{"make":"character","year":"integer"}'
        fields: String,
    },

    /// Reconcile an existing dynamic table against a new JSON field map
    UpdateTable {
        id: i64,
        /// e.g. '{"make":"character","make_year":"integer"}'
        fields: String,
    },

    /// Show the current columns of a dynamic table
    ShowTable { id: i64 },

    /// Insert a row from a JSON map of column name to value
    InsertRow {
        id: i64,
        /// e.g. '{"make":"toyota","year":2012}'
        values: String,
    },

    /// List all rows of a dynamic table
    ListRows { id: i64 },
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
