use clap::{Parser, Subcommand, ValueEnum};
use sqlv_core::ExportFormat;
use std::path::PathBuf;

/// sqlv - terminal host for the database console
#[derive(Parser, Debug)]
#[command(name = "sqlv")]
#[command(version)]
#[command(about = "Drive a sqlv console backend from the terminal", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to sqlv.toml in this or a parent directory)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides `[gateway] base_url`
    #[arg(short = 'u', long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Answer every confirmation with yes
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Print every re-rendered HTML fragment
    #[arg(long = "show-fragments", global = true)]
    pub show_fragments: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a database file and open it
    Open { path: PathBuf },

    /// Create a new empty database
    Create { name: String },

    /// List tables and indexes of the open database
    Tables,

    /// Show rows of a table
    View {
        table: String,

        /// Rows to fetch (defaults to `[view] page_size`)
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Run a SQL statement
    Query { sql: String },

    /// Generate SQL from a description
    Generate {
        prompt: String,

        /// Table to give the generator as context
        #[arg(long)]
        table: Option<String>,
    },

    DropTable { table: String },

    DropIndex { index: String },

    /// Delete a row by its position in the first page of the table
    DeleteRow { table: String, row_id: usize },

    /// Print the download URL of a table export
    Export {
        table: String,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => ExportFormat::Csv,
            Format::Json => ExportFormat::Json,
        }
    }
}
