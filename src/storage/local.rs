//! Local filesystem storage implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Ledger, LedgerDocument, LedgerFile, StorageConfig};
use crate::storage::{LedgerStore, write_atomic};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    ledger_file: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, ledger_file: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ledger_file: ledger_file.into(),
        }
    }

    /// Create a LocalStorage from the storage section of the configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root, &config.ledger_file)
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.path(&self.ledger_file)
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        write_atomic(self.path(key), bytes).await
    }

    /// Write JSON data.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl LedgerStore for LocalStorage {
    async fn load(&self) -> Result<Ledger> {
        let path = self.ledger_path();
        let Some(bytes) = self.read_bytes(&self.ledger_file).await? else {
            log::info!("No ledger at {}, starting empty", path.display());
            return Ok(Ledger::new());
        };

        let file: LedgerFile = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::corrupt_ledger(&path, e))?;
        if matches!(file, LedgerFile::Legacy(_)) {
            log::warn!(
                "Ledger at {} uses the legacy list format; it will be rewritten on next save",
                path.display()
            );
        }

        let ledger = file.into_ledger(Utc::now());
        log::info!("Loaded ledger with {} entries from {}", ledger.len(), path.display());
        Ok(ledger)
    }

    async fn save(&self, ledger: &Ledger) -> Result<()> {
        let document = LedgerDocument::new(ledger);
        self.write_json(&self.ledger_file, &document).await?;
        log::info!(
            "Ledger: {} entries written to {}",
            document.count,
            self.ledger_path().display()
        );
        Ok(())
    }
}
