//! Atomic file replacement.
//!
//! Content is written to a sibling temp file in the same directory, flushed
//! and synced, then renamed over the target. A rename within one file system
//! replaces the directory entry in a single step, so readers see either the
//! old complete file or the new complete file.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Temp path next to `path` (`all.txt` → `all.txt.tmp`).
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A file being written that replaces its target only on [`AtomicFile::commit`].
///
/// Dropping it without committing leaves the target untouched; the stale temp
/// file is overwritten by the next writer.
pub struct AtomicFile {
    target: PathBuf,
    tmp: PathBuf,
    file: File,
}

impl AtomicFile {
    /// Create the temp file, creating parent directories as needed.
    pub async fn create(target: impl Into<PathBuf>) -> Result<Self> {
        let target = target.into();
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::storage_write(&target, e))?;
            }
        }

        let tmp = temp_path(&target);
        let file = File::create(&tmp)
            .await
            .map_err(|e| AppError::storage_write(&target, e))?;
        Ok(Self { target, tmp, file })
    }

    /// Append bytes to the pending content.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| AppError::storage_write(&self.target, e))
    }

    /// Stream a whole file into the pending content.
    pub async fn append_file(&mut self, source: &Path) -> Result<u64> {
        let mut reader = File::open(source)
            .await
            .map_err(|e| AppError::storage_write(source, e))?;
        tokio::io::copy(&mut reader, &mut self.file)
            .await
            .map_err(|e| AppError::storage_write(&self.target, e))
    }

    /// Flush, sync, and rename over the target.
    pub async fn commit(mut self) -> Result<()> {
        let target = self.target.clone();
        let finish = async move {
            self.file.flush().await?;
            self.file.sync_all().await?;
            drop(self.file);
            fs::rename(&self.tmp, &self.target).await?;
            sync_parent(&self.target).await;
            Ok::<(), std::io::Error>(())
        };

        if let Err(e) = finish.await {
            let _ = fs::remove_file(temp_path(&target)).await;
            return Err(AppError::storage_write(&target, e));
        }
        Ok(())
    }

    /// Discard the pending content.
    pub async fn abort(self) {
        drop(self.file);
        let _ = fs::remove_file(&self.tmp).await;
    }
}

/// Make the rename itself durable. Best effort: not every platform allows
/// opening a directory for syncing.
#[cfg(unix)]
async fn sync_parent(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent).await {
        let _ = dir.sync_all().await;
    }
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) {}

/// Replace `path` with `bytes` atomically.
pub async fn write_atomic(path: impl Into<PathBuf>, bytes: &[u8]) -> Result<()> {
    let mut file = AtomicFile::create(path).await?;
    if let Err(e) = file.write_all(bytes).await {
        file.abort().await;
        return Err(e);
    }
    file.commit().await
}
