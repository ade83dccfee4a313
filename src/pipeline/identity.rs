// src/pipeline/identity.rs

//! Version-independent identity keys.
//!
//! A key is the arXiv identifier without its version suffix, so
//! `https://arxiv.org/pdf/2508.01234v3` and `https://arxiv.org/abs/2508.01234`
//! both resolve to `2508.01234`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::Record;

/// New-style `YYMM.NNNNN` or old-style `archive(.SC)/YYMMNNN`, optional version.
static ARXIV_ID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?$").ok()
});

/// Derive the identity key of a record from its links.
///
/// `source_link` is tried first, then `landing_link`.
pub fn resolve(record: &Record) -> Result<String> {
    let mut tried = Vec::new();
    for reference in record.references() {
        if let Some(key) = key_from_reference(reference) {
            return Ok(key);
        }
        tried.push(reference);
    }

    if tried.is_empty() {
        Err(AppError::malformed(record.label(), "record has no link"))
    } else {
        Err(AppError::malformed(
            tried.join(", "),
            "no arXiv identifier found",
        ))
    }
}

/// Extract the versionless identifier from a URL, an `arXiv:` reference, or a bare id.
pub fn key_from_reference(reference: &str) -> Option<String> {
    let mut rest = reference.trim();
    rest = rest.split(['?', '#']).next().unwrap_or(rest);

    if let Some(stripped) = strip_prefix_ignore_case(rest, "arxiv:") {
        rest = stripped;
    } else if let Some(idx) = find_path_marker(rest) {
        rest = &rest[idx..];
    }

    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".pdf").unwrap_or(rest);

    ARXIV_ID_RE
        .as_ref()?
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Byte offset just past `/abs/` or `/pdf/`.
fn find_path_marker(s: &str) -> Option<usize> {
    ["/abs/", "/pdf/"]
        .iter()
        .filter_map(|marker| s.find(marker).map(|i| i + marker.len()))
        .min()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
