// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod ledger;
mod record;
mod summary;

// Re-export all public types
pub use config::{
    Config, HttpConfig, LoggingConfig, RetryConfig, ScheduleConfig, SourceConfig, StorageConfig,
};
pub use ledger::{Ledger, LedgerDocument, LedgerEntry, LedgerFile};
pub use record::Record;
pub use summary::{FailureKind, ItemFailure, RunSummary};
