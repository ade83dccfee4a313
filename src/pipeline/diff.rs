//! New-versus-known classification of an incoming batch.
//!
//! Every record is resolved to its identity key, then checked against the
//! persisted ledger and against the keys already seen earlier in the same
//! batch. Only the first occurrence of an unknown key is treated as new.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{Ledger, Record};
use crate::pipeline::identity;

/// A new record paired with its resolved key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedRecord {
    pub identity_key: String,
    pub record: Record,
}

/// Outcome of one diff pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    /// Unknown records, in batch order
    pub new_records: Vec<KeyedRecord>,
    /// Known to the ledger or repeated within the batch
    pub duplicate_count: usize,
    /// No identifier could be resolved
    pub malformed_count: usize,
    /// Known records whose metadata differs from the ledger copy
    pub refreshed: Vec<KeyedRecord>,
}

impl DiffResult {
    /// Check if there is anything to ingest or refresh.
    pub fn has_changes(&self) -> bool {
        !self.new_records.is_empty() || !self.refreshed.is_empty()
    }
}

/// Calculator for the batch diff.
#[derive(Debug, Clone)]
pub struct DiffCalculator {
    /// Whether to report metadata changes of known records
    detect_refreshes: bool,
}

impl Default for DiffCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffCalculator {
    /// Create a new diff calculator.
    pub fn new() -> Self {
        Self {
            detect_refreshes: true,
        }
    }

    /// Create a diff calculator that only reports new records.
    pub fn additions_only() -> Self {
        Self {
            detect_refreshes: false,
        }
    }

    /// Classify `batch` against `ledger`.
    pub fn calculate(&self, batch: &[Record], ledger: &Ledger) -> DiffResult {
        let mut result = DiffResult::default();
        let mut seen: HashSet<String> = HashSet::new();

        for record in batch {
            let identity_key = match identity::resolve(record) {
                Ok(key) => key,
                Err(e) => {
                    log::warn!("Skipping malformed record '{}': {}", record.label(), e);
                    result.malformed_count += 1;
                    continue;
                }
            };

            if !seen.insert(identity_key.clone()) {
                log::debug!("Duplicate within batch: {}", identity_key);
                result.duplicate_count += 1;
                continue;
            }

            match ledger.get(&identity_key) {
                Some(entry) => {
                    result.duplicate_count += 1;
                    if self.detect_refreshes && !entry.record.same_metadata(record) {
                        result.refreshed.push(KeyedRecord {
                            identity_key,
                            record: record.clone(),
                        });
                    }
                }
                None => result.new_records.push(KeyedRecord {
                    identity_key,
                    record: record.clone(),
                }),
            }
        }

        result
    }
}
