//! arXiv harvester CLI
//!
//! Local execution entry point. For the daily loop, use `harvester-scheduler`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use harvester::{
    error::{AppError, Result},
    models::Config,
    pipeline::Harvester,
    services::{BatchFile, ListingSource},
    storage::{LedgerStore, LocalStorage, write_atomic},
};

/// harvester - incremental arXiv paper harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvests new arXiv papers into a deduplicated text corpus"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "harvester.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the search listing and sync new papers
    Run,

    /// Sync a batch previously saved as JSON
    Ingest {
        /// Path to a JSON array of records
        #[arg(long)]
        batch: PathBuf,
    },

    /// Scrape the search listing only and save the batch
    Scrape {
        /// Output file (default: the configured scrape file)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show ledger and corpus status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        }
    };

    match cli.command {
        Command::Run => {
            let (harvester, listing) = Harvester::from_config(config)?;
            let summary = harvester.run_once(&listing).await?;
            if summary.failed_count > 0 {
                log::warn!("{} paper(s) skipped, see warnings above", summary.failed_count);
            }
        }

        Command::Ingest { batch } => {
            let (harvester, _) = Harvester::from_config(config)?;
            if !batch.exists() {
                log::error!("Batch file not found at {}.", batch.display());
                return Err(AppError::config("Batch file not found"));
            }
            let records = BatchFile::new(&batch).fetch_batch().await?;
            harvester.run(records).await?;
        }

        Command::Scrape { output } => {
            let output = output.unwrap_or_else(|| config.storage.scrape_path());
            let (_, listing) = Harvester::from_config(config)?;

            let batch = listing.fetch_batch().await?;
            write_atomic(&output, &serde_json::to_vec_pretty(&batch)?).await?;
            log::info!("Saved {} records to {}", batch.len(), output.display());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let storage = &config.storage;
            log::info!("Storage root: {}", storage.root.display());

            let ledger = LocalStorage::from_config(storage).load().await?;
            log::info!("Ledger: {} paper(s)", ledger.len());
            match ledger.last_ingested_at() {
                Some(at) => log::info!("Last ingestion: {}", at.to_rfc3339()),
                None => log::info!("Nothing ingested yet."),
            }

            match tokio::fs::metadata(storage.corpus_path()).await {
                Ok(meta) => log::info!(
                    "Corpus: {} ({} bytes)",
                    storage.corpus_path().display(),
                    meta.len()
                ),
                Err(_) => log::info!("Corpus: not created yet"),
            }

            if let Ok(content) = tokio::fs::read_to_string(storage.stats_path()).await {
                if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                    if let Some(finished) = stats.get("finished_at") {
                        log::info!("Last run finished: {}", finished);
                    }
                    if let Some(new) = stats.get("new_count") {
                        log::info!("Last run new papers: {}", new);
                    }
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
