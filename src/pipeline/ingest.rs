// src/pipeline/ingest.rs

//! Per-item fetch, extract, and persist.
//!
//! Items are processed one at a time. Any failure is recorded as an
//! [`ItemFailure`] and the item is dropped; the batch always continues.
//! Extraction is CPU-bound and runs on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ExtractError, FetchError};
use crate::models::{ItemFailure, Record};
use crate::pipeline::diff::KeyedRecord;
use crate::services::{Extractor, Fetcher};
use crate::storage::write_atomic;
use crate::utils::filename::{FilenameAllocator, short_hash};
use crate::utils::url::landing_to_pdf;

/// A record whose text has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedItem {
    pub identity_key: String,
    pub record: Record,
    pub text_path: PathBuf,
}

/// Results of ingesting a list of new records.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Successes, in input order
    pub processed: Vec<IngestedItem>,
    pub failures: Vec<ItemFailure>,
}

/// Runs fetch, extract and persist for each new record.
pub struct Orchestrator<'a> {
    fetcher: &'a dyn Fetcher,
    extractor: Arc<dyn Extractor>,
    text_dir: PathBuf,
    pdf_dir: Option<PathBuf>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        extractor: Arc<dyn Extractor>,
        text_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            text_dir: text_dir.into(),
            pdf_dir: None,
        }
    }

    /// Also keep each fetched document under `pdf_dir`.
    pub fn keep_documents(mut self, pdf_dir: impl Into<PathBuf>) -> Self {
        self.pdf_dir = Some(pdf_dir.into());
        self
    }

    pub async fn ingest(&self, records: &[KeyedRecord]) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        let mut names = FilenameAllocator::new("txt");
        let total = records.len();

        for (idx, item) in records.iter().enumerate() {
            let file_name = names.allocate(&item.identity_key, &item.record.title);
            log::info!(
                "[{}/{}] {} {}",
                idx + 1,
                total,
                item.identity_key,
                item.record.label()
            );

            match self.ingest_one(item, &self.text_dir.join(&file_name)).await {
                Ok(text_path) => outcome.processed.push(IngestedItem {
                    identity_key: item.identity_key.clone(),
                    record: item.record.clone(),
                    text_path,
                }),
                Err(failure) => {
                    log::warn!(
                        "Skipping {} ({}): {}",
                        failure.identity_key,
                        failure.kind,
                        failure.message
                    );
                    outcome.failures.push(failure);
                }
            }
        }

        outcome
    }

    async fn ingest_one(
        &self,
        item: &KeyedRecord,
        text_path: &Path,
    ) -> std::result::Result<PathBuf, ItemFailure> {
        let key = item.identity_key.as_str();
        let uri = source_uri(&item.record)
            .ok_or_else(|| {
                ItemFailure::fetch(key, &FetchError::permanent("", "record has no source link"))
            })?;

        let bytes = self
            .fetcher
            .fetch(&uri)
            .await
            .map_err(|e| ItemFailure::fetch(key, &e))?;

        let extractor = Arc::clone(&self.extractor);
        let (text, bytes) = tokio::task::spawn_blocking(move || {
            let text = extractor.extract(&bytes);
            (text, bytes)
        })
        .await
        .map_err(|e| ItemFailure::extract(key, &ExtractError::Pdf(e.to_string())))?;
        let text = text.map_err(|e| ItemFailure::extract(key, &e))?;

        write_atomic(text_path, text.as_bytes())
            .await
            .map_err(|e| ItemFailure::persist(key, e))?;

        if let Some(pdf_dir) = &self.pdf_dir {
            let pdf_path = match text_path.file_stem() {
                Some(stem) => pdf_dir.join(format!("{}.pdf", stem.to_string_lossy())),
                None => pdf_dir.join(format!("{}.pdf", short_hash(key))),
            };
            if let Err(e) = write_atomic(&pdf_path, &bytes).await {
                log::warn!("Could not keep document for {}: {}", key, e);
            }
        }

        log::debug!("Wrote {} bytes of text to {}", text.len(), text_path.display());
        Ok(text_path.to_path_buf())
    }
}

/// The document link to fetch: the source link, else the PDF derived from the landing page.
fn source_uri(record: &Record) -> Option<String> {
    let source = record.source_link.trim();
    if !source.is_empty() {
        return Some(source.to_string());
    }
    landing_to_pdf(record.landing_link.trim())
}
