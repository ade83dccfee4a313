//! Corpus merging.
//!
//! The corpus is one text file that grows by whole items. A merge streams the
//! existing corpus followed by the new texts into a temp file and renames it
//! over the corpus, so readers never see a partial merge.

use std::path::PathBuf;

use crate::error::Result;
use crate::storage::AtomicFile;

/// Delimiter written between items.
pub const SEPARATOR: &str = "\n\n------------------------------\n\n";

/// Appends per-item texts to the corpus file.
#[derive(Debug, Clone)]
pub struct CorpusMerger {
    path: PathBuf,
}

impl CorpusMerger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append `texts` in order and return the corpus path.
    ///
    /// An empty list leaves the corpus untouched.
    pub async fn merge(&self, texts: &[PathBuf]) -> Result<PathBuf> {
        if texts.is_empty() {
            log::debug!("Nothing to merge into {}", self.path.display());
            return Ok(self.path.clone());
        }

        let existing_len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let mut out = AtomicFile::create(&self.path).await?;
        match self.write_merged(&mut out, existing_len > 0, texts).await {
            Ok(appended) => {
                out.commit().await?;
                log::info!(
                    "Corpus: appended {} item(s), {} bytes, to {}",
                    texts.len(),
                    appended,
                    self.path.display()
                );
                Ok(self.path.clone())
            }
            Err(e) => {
                out.abort().await;
                Err(e)
            }
        }
    }

    async fn write_merged(
        &self,
        out: &mut AtomicFile,
        has_existing: bool,
        texts: &[PathBuf],
    ) -> Result<u64> {
        let mut needs_separator = false;
        if has_existing {
            out.append_file(&self.path).await?;
            needs_separator = true;
        }

        let mut appended = 0u64;
        for text in texts {
            if needs_separator {
                out.write_all(SEPARATOR.as_bytes()).await?;
                appended += SEPARATOR.len() as u64;
            }
            appended += out.append_file(text).await?;
            needs_separator = true;
        }
        Ok(appended)
    }
}
