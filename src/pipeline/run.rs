// src/pipeline/run.rs

//! One sync pass: diff, ingest, merge, commit.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Config, Ledger, Record, RunSummary};
use crate::pipeline::corpus::CorpusMerger;
use crate::pipeline::diff::{DiffCalculator, DiffResult};
use crate::pipeline::ingest::{IngestOutcome, Orchestrator};
use crate::services::{
    ArxivListing, Extractor, Fetcher, HttpFetcher, ListingSource, Pacer, PdfExtractor, RetryPolicy,
};
use crate::storage::{LedgerStore, LocalStorage, write_atomic};
use crate::utils::http::create_async_client;
use crate::utils::log as console;

const TOTAL_STEPS: usize = 5;

/// Run coordinator.
///
/// Owns the ledger store and the fetch/extract capabilities. A pass assumes
/// exclusive use of the storage root; overlapping passes are not safe.
pub struct Harvester {
    config: Config,
    store: Box<dyn LedgerStore>,
    fetcher: Box<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
}

impl Harvester {
    pub fn new(
        config: Config,
        store: Box<dyn LedgerStore>,
        fetcher: Box<dyn Fetcher>,
        extractor: Box<dyn Extractor>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            extractor: Arc::from(extractor),
        }
    }

    /// Production wiring: local storage, paced HTTP fetcher with retry, PDF
    /// extraction. The returned listing shares the fetcher's client, pacer and
    /// retry policy.
    ///
    /// The configuration is validated first.
    pub fn from_config(config: Config) -> Result<(Self, ArxivListing)> {
        config.validate()?;

        let client = create_async_client(&config.http)?;
        let pacer = Arc::new(Pacer::new(config.http.request_delay()));
        let fetcher = HttpFetcher::new(client, pacer, RetryPolicy::from_config(&config.retry));
        let listing = ArxivListing::new(fetcher.clone(), config.source.search_url.clone());
        let store = LocalStorage::from_config(&config.storage);

        let harvester = Self::new(
            config,
            Box::new(store),
            Box::new(fetcher),
            Box::new(PdfExtractor::new()),
        );
        Ok((harvester, listing))
    }

    /// Scrape a batch from `source`, keep it as the audit file, and sync it.
    ///
    /// A scrape failure aborts before the ledger is read.
    pub async fn run_once(&self, source: &dyn ListingSource) -> Result<RunSummary> {
        let batch = source
            .fetch_batch()
            .await
            .map_err(|e| AppError::scrape(source.describe(), e))?;
        self.write_audit(&batch).await;
        self.run(batch).await
    }

    /// Sync one batch into the ledger and corpus.
    ///
    /// Per-item failures are reported in the summary. Errors are returned only
    /// for ledger corruption and ledger or corpus write failures.
    pub async fn run(&self, batch: Vec<Record>) -> Result<RunSummary> {
        let started_at = Utc::now();
        let storage = &self.config.storage;
        console::header(&format!("Sync pass: {} record(s)", batch.len()));

        console::step(1, TOTAL_STEPS, "Loading ledger");
        let mut ledger = self.store.load().await?;
        console::sub_item(&format!("{} known paper(s)", ledger.len()));

        console::step(2, TOTAL_STEPS, "Comparing batch with ledger");
        let diff = DiffCalculator::new().calculate(&batch, &ledger);
        console::sub_item(&format!(
            "new: {}, duplicate: {}, malformed: {}, refreshed: {}",
            diff.new_records.len(),
            diff.duplicate_count,
            diff.malformed_count,
            diff.refreshed.len()
        ));

        console::step(3, TOTAL_STEPS, "Fetching and extracting new papers");
        let mut orchestrator = Orchestrator::new(
            self.fetcher.as_ref(),
            Arc::clone(&self.extractor),
            storage.text_path(),
        );
        if storage.keep_pdfs {
            orchestrator = orchestrator.keep_documents(storage.pdf_path());
        }
        let outcome = orchestrator.ingest(&diff.new_records).await;

        // Corpus first: a crash before the ledger save only causes a re-fetch.
        console::step(4, TOTAL_STEPS, "Merging corpus");
        let texts: Vec<_> = outcome.processed.iter().map(|i| i.text_path.clone()).collect();
        CorpusMerger::new(storage.corpus_path()).merge(&texts).await?;

        console::step(5, TOTAL_STEPS, "Committing ledger");
        if commit(&mut ledger, &diff, &outcome, started_at) {
            self.store.save(&ledger).await?;
        } else {
            console::sub_item("No changes, ledger left as is");
        }

        if !storage.keep_text_files {
            remove_texts(&texts).await;
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            batch_count: batch.len(),
            new_count: outcome.processed.len(),
            duplicate_count: diff.duplicate_count,
            malformed_count: diff.malformed_count,
            failed_count: outcome.failures.len(),
            refreshed_count: diff.refreshed.len(),
            failures: outcome.failures,
        };
        self.write_stats(&summary).await;
        console::summary("Sync pass complete", &summary.items());
        Ok(summary)
    }

    async fn write_audit(&self, batch: &[Record]) {
        let path = self.config.storage.scrape_path();
        let written = match serde_json::to_vec_pretty(batch) {
            Ok(bytes) => write_atomic(&path, &bytes).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            log::warn!("Could not write scrape file {}: {}", path.display(), e);
        }
    }

    async fn write_stats(&self, summary: &RunSummary) {
        let path = self.config.storage.stats_path();
        let written = match serde_json::to_vec_pretty(summary) {
            Ok(bytes) => write_atomic(&path, &bytes).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            log::warn!("Could not write stats file {}: {}", path.display(), e);
        }
    }
}

/// Apply ingested and refreshed records to the ledger. Returns whether it changed.
fn commit(
    ledger: &mut Ledger,
    diff: &DiffResult,
    outcome: &IngestOutcome,
    started_at: chrono::DateTime<Utc>,
) -> bool {
    let now = Utc::now();
    for item in &outcome.processed {
        ledger.upsert(&item.identity_key, item.record.clone(), started_at, now);
    }
    for refreshed in &diff.refreshed {
        ledger.upsert(&refreshed.identity_key, refreshed.record.clone(), started_at, now);
    }
    !outcome.processed.is_empty() || !diff.refreshed.is_empty()
}

async fn remove_texts(texts: &[std::path::PathBuf]) {
    for path in texts {
        if let Err(e) = tokio::fs::remove_file(path).await {
            log::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.storage.root = root.to_path_buf();
        config
    }

    #[test]
    fn test_from_config_rejects_invalid_retry() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(tmp.path());
        config.retry.jitter = f64::NAN;

        let err = Harvester::from_config(config).err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));

        let mut config = config_in(tmp.path());
        config.retry.max_attempts = 0;
        assert!(Harvester::from_config(config).is_err());
    }

    #[test]
    fn test_from_config_shares_search_url_with_listing() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let search_url = config.source.search_url.clone();

        let (_, listing) = Harvester::from_config(config).unwrap();
        assert_eq!(listing.describe(), search_url);
    }
}
