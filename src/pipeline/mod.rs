//! The incremental sync engine.
//!
//! - `identity`: version-independent keys for records
//! - `diff`: new-versus-known classification of a batch
//! - `ingest`: per-item fetch, extract, persist
//! - `corpus`: atomic corpus merge
//! - `run`: the coordinator tying one pass together

pub mod corpus;
pub mod diff;
pub mod identity;
pub mod ingest;
pub mod run;

pub use corpus::{CorpusMerger, SEPARATOR};
pub use diff::{DiffCalculator, DiffResult, KeyedRecord};
pub use ingest::{IngestOutcome, IngestedItem, Orchestrator};
pub use run::Harvester;
