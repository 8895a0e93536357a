//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hygiene-dash - hand-hygiene compliance statistics for hospital dashboards
///
/// Imports observation form exports and serves compliance percentages by
/// sector, professional role, WHO moment and shift.
///
/// Examples:
///   hygiene-dash import hdmNoviembreFinal.csv
///   hygiene-dash serve --port 3001
///   hygiene-dash report --format json --output stats.json
///   hygiene-dash init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .hygiene-dash.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// JSON snapshot holding the observation records
    #[arg(long, value_name = "FILE", env = "HYGIENE_DASH_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the statistics API
    Serve(ServeArgs),
    /// Import an observation form export, replacing all stored records
    Import(ImportArgs),
    /// Print every statistic as a report
    Report(ReportArgs),
    /// Generate a default .hygiene-dash.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HYGIENE_DASH_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Load the snapshot once at startup instead of on every request
    #[arg(long)]
    pub preload: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// Delimited export of the observation form (header row required)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Field delimiter
    #[arg(short, long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Parse and count rows without touching the store
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReportArgs {
    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Serve(serve) => {
                if serve.port == Some(0) {
                    return Err("Port must be between 1 and 65535".to_string());
                }
            }
            Command::Import(import) => {
                if let Some(delimiter) = import.delimiter {
                    if !delimiter.is_ascii() || delimiter == '"' {
                        return Err(format!("Invalid delimiter: {:?}", delimiter));
                    }
                }
                if !import.file.exists() {
                    return Err(format!(
                        "Import file does not exist: {}",
                        import.file.display()
                    ));
                }
                if !import.file.is_file() {
                    return Err(format!(
                        "Import path is not a file: {}",
                        import.file.display()
                    ));
                }
            }
            Command::Report(_) | Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
