//! Daily trigger for the arXiv harvester.
//!
//! Reads the configuration path from `HARVESTER_CONFIG` (default
//! `harvester.toml`), then runs one pass per day at the configured local time.
//! Each pass is awaited before the next is scheduled, so passes never overlap.

use std::time::Duration;

use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use harvester::{error::Result, models::Config, pipeline::Harvester};

const CONFIG_ENV: &str = "HARVESTER_CONFIG";

/// Main entry point for the scheduler daemon.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "harvester.toml".to_string());
    let loaded = Config::load(&config_path);

    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %config_path, error = %e, "config load failed, using defaults");
            Config::default()
        }
    };

    let schedule = config.schedule.clone();
    let (harvester, listing) = Harvester::from_config(config)?;
    info!(
        hour = schedule.hour,
        minute = schedule.minute,
        "harvester scheduler started"
    );

    loop {
        let now = Local::now();
        let Some(next) = schedule.next_run_after(&now) else {
            error!("could not compute the next run time");
            return Ok(());
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        let next_run = next.to_rfc3339();
        info!(next_run = %next_run, wait_secs = wait.as_secs(), "sleeping until next pass");
        tokio::time::sleep(wait).await;

        match harvester.run_once(&listing).await {
            Ok(summary) => info!(
                new = summary.new_count,
                duplicate = summary.duplicate_count,
                malformed = summary.malformed_count,
                failed = summary.failed_count,
                refreshed = summary.refreshed_count,
                "pass complete"
            ),
            Err(e) => error!(error = %e, "pass aborted"),
        }
    }
}
