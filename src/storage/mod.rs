//! Storage abstractions for ledger persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! paper/
//! ├── base.json                  # Ledger: every ingested paper
//! ├── arxiv_search_result.json   # Latest scrape (audit only)
//! ├── all.txt                    # Corpus
//! ├── stats.json                 # Latest run summary
//! ├── pdf/                       # Raw documents (only with keep_pdfs)
//! └── txt/                       # Per-item text (removed after merge)
//! ```
//!
//! Every durable file is written through [`atomic`], so a crash mid-write
//! leaves the previous version in place.

pub mod atomic;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Ledger;

// Re-export for convenience
pub use atomic::{AtomicFile, write_atomic};
pub use local::LocalStorage;

/// Trait for ledger storage backends.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the persisted ledger.
    ///
    /// A missing ledger is an empty one. A ledger that exists but cannot be
    /// parsed is [`crate::error::AppError::CorruptLedger`].
    async fn load(&self) -> Result<Ledger>;

    /// Replace the persisted ledger atomically.
    async fn save(&self, ledger: &Ledger) -> Result<()>;
}
