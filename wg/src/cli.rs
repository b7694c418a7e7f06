//! CLI command definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// WordGlance - multi-tile corpus statistics dashboard
#[derive(Parser)]
#[command(name = "wg", about = "Run corpus statistics tiles against remote data sources", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one query across all configured tiles and print the results
    Query {
        /// Word or phrase to look up
        word: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate the configuration (tiles and dependency edges) and exit
    Check,

    /// List configured tiles and dependency edges
    Tiles,
}

/// Output format for query results
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
