//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hygiene-dash.toml` files.

use crate::analysis::GlobalPredicate;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".hygiene-dash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Import settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Statistic settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot holding every observation.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Load the snapshot once at startup instead of on every request.
    #[serde(default)]
    pub preload: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            preload: false,
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("observaciones_higiene.json")
}

/// Import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Field delimiter of the source file (a single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Statistic settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Rule for the hospital-wide summary: `consistent` or `action_present`.
    #[serde(default)]
    pub global_predicate: GlobalPredicate,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Cli) {
        if let Some(ref data_file) = args.data_file {
            self.store.data_file = data_file.clone();
        }

        match &args.command {
            crate::cli::Command::Serve(serve) => {
                if let Some(ref host) = serve.host {
                    self.server.host = host.clone();
                }
                if let Some(port) = serve.port {
                    self.server.port = port;
                }
                if serve.preload {
                    self.store.preload = true;
                }
            }
            crate::cli::Command::Import(import) => {
                if let Some(delimiter) = import.delimiter {
                    self.import.delimiter = delimiter;
                }
            }
            crate::cli::Command::Report(_) | crate::cli::Command::InitConfig => {}
        }
    }

    /// Delimiter as a byte for the CSV reader.
    pub fn delimiter_byte(&self) -> Result<u8> {
        let delimiter = self.import.delimiter;
        if delimiter.is_ascii() {
            Ok(delimiter as u8)
        } else {
            anyhow::bail!("Delimiter must be a single ASCII character, got {:?}", delimiter)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
