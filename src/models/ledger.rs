//! Persistent ledger of ingested papers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Record;

/// One ledger entry: the record plus its ingestion timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub record: Record,
    /// When the paper first showed up as new in a scrape
    pub first_seen_at: DateTime<Utc>,
    /// When its text was committed to the corpus
    pub ingested_at: DateTime<Utc>,
    /// Last time its metadata was refreshed from a later scrape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Mapping from identity key to entry.
///
/// Keys are never removed: entries are only added or have their record
/// refreshed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity_key: &str) -> bool {
        self.entries.contains_key(identity_key)
    }

    pub fn get(&self, identity_key: &str) -> Option<&LedgerEntry> {
        self.entries.get(identity_key)
    }

    /// Insert a newly ingested record, or refresh the record of a known key.
    ///
    /// Refreshing keeps `first_seen_at` and `ingested_at` of the existing entry.
    pub fn upsert(
        &mut self,
        identity_key: &str,
        mut record: Record,
        first_seen_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        record.identity_key = identity_key.to_string();
        match self.entries.get_mut(identity_key) {
            Some(entry) => {
                entry.record = record;
                entry.refreshed_at = Some(now);
            }
            None => {
                self.entries.insert(
                    identity_key.to_string(),
                    LedgerEntry {
                        record,
                        first_seen_at,
                        ingested_at: now,
                        refreshed_at: None,
                    },
                );
            }
        }
    }

    /// Most recent ingestion time, if any.
    pub fn last_ingested_at(&self) -> Option<DateTime<Utc>> {
        self.entries.values().map(|e| e.ingested_at).max()
    }
}

/// On-disk ledger document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// ISO 8601 timestamp of last save
    pub updated_at: DateTime<Utc>,
    /// Entry count
    pub count: usize,
    pub entries: BTreeMap<String, LedgerEntry>,
}

impl LedgerDocument {
    pub fn new(ledger: &Ledger) -> Self {
        Self {
            updated_at: Utc::now(),
            count: ledger.len(),
            entries: ledger.entries.clone(),
        }
    }
}

/// Any ledger file layout this crate can read.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LedgerFile {
    Current(LedgerDocument),
    /// Flat array of records carrying `identity_key`
    Legacy(Vec<Record>),
}

impl LedgerFile {
    /// Convert into an in-memory ledger. Legacy records get `loaded_at` as
    /// both timestamps; records without a key are dropped.
    pub fn into_ledger(self, loaded_at: DateTime<Utc>) -> Ledger {
        match self {
            LedgerFile::Current(doc) => Ledger {
                entries: doc.entries,
            },
            LedgerFile::Legacy(records) => {
                let mut ledger = Ledger::new();
                for record in records {
                    let key = record.identity_key.trim().to_string();
                    if key.is_empty() {
                        log::warn!("Dropping legacy ledger record without key: {}", record.label());
                        continue;
                    }
                    if !ledger.contains(&key) {
                        ledger.upsert(&key, record, loaded_at, loaded_at);
                    }
                }
                ledger
            }
        }
    }
}
