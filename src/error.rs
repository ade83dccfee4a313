// src/error.rs

//! Unified error handling for the harvester.
//!
//! Errors fall into two groups. Item-level errors ([`FetchError`],
//! [`ExtractError`], [`AppError::MalformedReference`]) are caught at the item
//! boundary and recorded in the run summary. Store-level errors
//! ([`AppError::CorruptLedger`], [`AppError::StorageWrite`]) abort the run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// No canonical identifier could be derived from a record
    #[error("Malformed reference '{reference}': {message}")]
    MalformedReference { reference: String, message: String },

    /// Request failed after the retry policy gave up
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Ledger file exists but cannot be parsed
    #[error("Corrupt ledger at {path}: {message}")]
    CorruptLedger { path: PathBuf, message: String },

    /// Atomic replace of a durable file failed
    #[error("Storage write failed for {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Search listing could not be scraped
    #[error("Scrape error for {context}: {message}")]
    Scrape { context: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed reference error.
    pub fn malformed(reference: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedReference {
            reference: reference.into(),
            message: message.to_string(),
        }
    }

    /// Create a corrupt ledger error.
    pub fn corrupt_ledger(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::CorruptLedger {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a storage write error.
    pub fn storage_write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a scrape error with context.
    pub fn scrape(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Scrape {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Whether a failed fetch is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Timeouts, connection resets, rate limiting, server errors
    Transient,
    /// Not found, forbidden, or retries exhausted
    Permanent,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Transient => write!(f, "transient"),
            FetchErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Failure to acquire a source document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} fetch error for {uri}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub uri: String,
    pub message: String,
}

impl FetchError {
    pub fn transient(uri: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            kind: FetchErrorKind::Transient,
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    pub fn permanent(uri: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            kind: FetchErrorKind::Permanent,
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FetchErrorKind::Transient
    }

    /// Downgrade to permanent once retries are exhausted.
    pub fn exhausted(self, attempts: u32) -> Self {
        Self {
            kind: FetchErrorKind::Permanent,
            message: format!("gave up after {attempts} attempt(s): {}", self.message),
            uri: self.uri,
        }
    }
}

/// Failure to turn a fetched document into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("document contains no extractable text")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_fetch_error_becomes_permanent() {
        let err = FetchError::transient("https://arxiv.org/pdf/2501.00001", "timed out");
        assert!(err.is_transient());

        let err = err.exhausted(5);
        assert_eq!(err.kind, FetchErrorKind::Permanent);
        assert!(err.message.contains("5 attempt"));
        assert!(err.message.contains("timed out"));
    }

    #[test]
    fn fetch_error_display_names_kind() {
        let err = FetchError::permanent("https://arxiv.org/pdf/x", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "permanent fetch error for https://arxiv.org/pdf/x: HTTP 404"
        );
    }

    #[test]
    fn storage_write_keeps_path() {
        let err = AppError::storage_write(
            "paper/base.json",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(err.to_string().contains("paper/base.json"));
        assert!(err.to_string().contains("disk full"));
    }
}
