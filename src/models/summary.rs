//! Run outcome reporting.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, FetchError, FetchErrorKind};

/// Step at which an item was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FetchTransient,
    FetchPermanent,
    Extract,
    Persist,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::FetchTransient => "fetch (transient)",
            FailureKind::FetchPermanent => "fetch (permanent)",
            FailureKind::Extract => "extract",
            FailureKind::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A record that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub identity_key: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ItemFailure {
    pub fn fetch(identity_key: &str, err: &FetchError) -> Self {
        let kind = match err.kind {
            FetchErrorKind::Transient => FailureKind::FetchTransient,
            FetchErrorKind::Permanent => FailureKind::FetchPermanent,
        };
        Self {
            identity_key: identity_key.to_string(),
            kind,
            message: err.to_string(),
        }
    }

    pub fn extract(identity_key: &str, err: &ExtractError) -> Self {
        Self {
            identity_key: identity_key.to_string(),
            kind: FailureKind::Extract,
            message: err.to_string(),
        }
    }

    pub fn persist(identity_key: &str, message: impl fmt::Display) -> Self {
        Self {
            identity_key: identity_key.to_string(),
            kind: FailureKind::Persist,
            message: message.to_string(),
        }
    }
}

/// Counts reported to the trigger after one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records in the incoming batch
    pub batch_count: usize,
    /// Records ingested into both ledger and corpus
    pub new_count: usize,
    /// Records already known, from the ledger or earlier in the batch
    pub duplicate_count: usize,
    /// Records without a recognizable identifier
    pub malformed_count: usize,
    /// New records skipped by a fetch, extract, or persist failure
    pub failed_count: usize,
    /// Known records whose metadata was refreshed
    pub refreshed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

impl RunSummary {
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            batch_count: 0,
            new_count: 0,
            duplicate_count: 0,
            malformed_count: 0,
            failed_count: 0,
            refreshed_count: 0,
            failures: Vec::new(),
        }
    }

    /// Key/value lines for console output.
    pub fn items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Batch", self.batch_count.to_string()),
            ("New", self.new_count.to_string()),
            ("Duplicate", self.duplicate_count.to_string()),
            ("Malformed", self.malformed_count.to_string()),
            ("Failed", self.failed_count.to_string()),
            ("Refreshed", self.refreshed_count.to_string()),
            (
                "Duration",
                format!(
                    "{:.1}s",
                    (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failure_kind_follows_error_kind() {
        let transient = FetchError::transient("u", "429");
        let permanent = FetchError::permanent("u", "404");

        assert_eq!(
            ItemFailure::fetch("k", &transient).kind,
            FailureKind::FetchTransient
        );
        assert_eq!(
            ItemFailure::fetch("k", &permanent).kind,
            FailureKind::FetchPermanent
        );
    }

    #[test]
    fn summary_items_list_counts() {
        let mut summary = RunSummary::empty(Utc::now());
        summary.new_count = 4;
        summary.failed_count = 1;

        let items = summary.items();
        assert!(items.contains(&("New", "4".to_string())));
        assert!(items.contains(&("Failed", "1".to_string())));
    }
}
