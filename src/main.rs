//! hygiene-dash - hand-hygiene compliance statistics service
//!
//! Imports observation form exports into a record store and serves
//! compliance percentages by sector, professional role, WHO moment and
//! shift, plus a histogram of the hygiene techniques used.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, store access, import failure, etc.)

mod analysis;
mod cli;
mod config;
mod import;
mod models;
mod report;
mod server;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Cli, Command, ImportArgs, OutputFormat, ReportArgs};
use config::{Config, DEFAULT_CONFIG_FILE};
use std::sync::Arc;
use store::{InMemoryStore, JsonFileStore, RecordStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Validate arguments
    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(cli.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&cli);

    info!("hygiene-dash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", cli);

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .hygiene-dash.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the data file, port and allowed origins.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(cli: &Cli) {
    let level = cli.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the selected subcommand.
async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    config.merge_with_args(&cli);

    let store = JsonFileStore::open(&config.store.data_file).with_context(|| {
        format!(
            "Failed to open record store {}",
            config.store.data_file.display()
        )
    })?;

    match cli.command {
        Command::Serve(_) => run_serve(&config, store).await,
        Command::Import(ref args) => run_import(&config, &store, args, cli.quiet).await,
        Command::Report(ref args) => run_report(&config, &store, args).await,
        Command::InitConfig => Ok(()),
    }
}

async fn run_serve(config: &Config, store: JsonFileStore) -> Result<()> {
    let store: Arc<dyn RecordStore> = if config.store.preload {
        let cached = InMemoryStore::preload(&store)
            .await
            .context("Failed to preload records")?;
        info!(store = %cached.describe(), "Serving from preloaded snapshot");
        Arc::new(cached)
    } else {
        Arc::new(store)
    };

    let state = server::AppState::new(store, config.analysis.global_predicate);
    server::run_server(state, &config.server).await
}

async fn run_import(
    config: &Config,
    store: &JsonFileStore,
    args: &ImportArgs,
    quiet: bool,
) -> Result<()> {
    let options = import::ImportOptions {
        delimiter: config.delimiter_byte()?,
        dry_run: args.dry_run,
        show_progress: !quiet,
    };

    let summary = import::import_file(&args.file, store, &options)
        .await
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "Some rows were skipped");
    }

    if !quiet {
        let verb = if args.dry_run { "Parsed" } else { "Imported" };
        println!(
            "✅ {} {} observations into {} ({} rows skipped)",
            verb,
            summary.imported,
            store.path().display(),
            summary.skipped
        );
    }

    Ok(())
}

async fn run_report(config: &Config, store: &JsonFileStore, args: &ReportArgs) -> Result<()> {
    let records = store.all().await.context("Failed to read records")?;
    let stats = analysis::StatsSnapshot::compute(&records, config.analysis.global_predicate);

    let metadata = report::ReportMetadata {
        generated_at: Utc::now(),
        source: store.describe(),
        record_count: records.len(),
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&metadata, &stats)?,
        OutputFormat::Markdown => report::generate_markdown_report(&metadata, &stats),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(cli: &Cli) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = cli.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
