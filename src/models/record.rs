//! Paper metadata record.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One discovered paper.
///
/// `identity_key` is filled in by the identity resolver and is stable across
/// re-scrapes of the same paper, whatever its version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Versionless canonical identifier (e.g. `2501.12345`)
    #[serde(default)]
    pub identity_key: String,

    /// Paper title
    #[serde(default)]
    pub title: String,

    /// Authors in listing order
    #[serde(default)]
    pub authors: Vec<String>,

    /// Full abstract
    #[serde(default, rename = "abstract")]
    pub summary: String,

    /// Link to the raw document (PDF)
    #[serde(default, alias = "pdf_url")]
    pub source_link: String,

    /// Link to the landing (abstract) page
    #[serde(default, alias = "abs_url", skip_serializing_if = "String::is_empty")]
    pub landing_link: String,

    /// Original submission date, when the listing showed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<NaiveDate>,

    /// Fields not modelled above, kept verbatim
    #[serde(flatten)]
    pub raw_metadata: BTreeMap<String, Value>,
}

impl Record {
    /// Canonical references in resolution order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        [self.source_link.as_str(), self.landing_link.as_str()]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
    }

    /// Whether two records carry the same metadata apart from the identity key.
    pub fn same_metadata(&self, other: &Record) -> bool {
        self.title == other.title
            && self.authors == other.authors
            && self.summary == other.summary
            && self.source_link == other.source_link
            && self.landing_link == other.landing_link
            && self.submitted_date == other.submitted_date
            && self.raw_metadata == other.raw_metadata
    }

    /// Short label for log lines.
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            self.references().next().unwrap_or("<untitled>")
        } else {
            &self.title
        }
    }
}
