// src/services/listing.rs

//! Batch producers.
//!
//! Parses the arXiv search results page into [`Record`]s, or reads a batch
//! that was saved earlier.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Record;
use crate::services::{Fetcher, HttpFetcher};
use crate::utils::url::{landing_to_pdf, resolve};

static SUBMITTED_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)submitted\s+(\d{1,2})\s+([a-z]+),?\s+(\d{4})").ok());

/// Producer of one scrape pass.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Short description for log lines.
    fn describe(&self) -> String;

    async fn fetch_batch(&self) -> Result<Vec<Record>>;
}

/// The arXiv search results page.
///
/// Requests go through the same paced, retrying fetcher as the papers, so a
/// 503 or 429 from the search page is retried before the pass is aborted.
pub struct ArxivListing {
    fetcher: HttpFetcher,
    search_url: String,
}

impl ArxivListing {
    pub fn new(fetcher: HttpFetcher, search_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            search_url: search_url.into(),
        }
    }
}

#[async_trait]
impl ListingSource for ArxivListing {
    fn describe(&self) -> String {
        self.search_url.clone()
    }

    async fn fetch_batch(&self) -> Result<Vec<Record>> {
        log::info!("Fetching search results: {}", self.search_url);
        let bytes = self.fetcher.fetch(&self.search_url).await?;
        let html = String::from_utf8_lossy(&bytes);
        parse_listing(&html, &self.search_url)
    }
}

/// A batch stored as a JSON array of records.
pub struct BatchFile {
    path: PathBuf,
}

impl BatchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ListingSource for BatchFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_batch(&self) -> Result<Vec<Record>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let records: Vec<Record> = serde_json::from_slice(&bytes)?;
        log::info!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

struct ListingSelectors {
    result: Selector,
    title: Selector,
    list_title: Selector,
    anchor: Selector,
    authors: Selector,
    abstract_full: Selector,
    dateline: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            result: parse_selector("li.arxiv-result")?,
            title: parse_selector("p.title")?,
            list_title: parse_selector("p.list-title")?,
            anchor: parse_selector("a")?,
            authors: parse_selector("p.authors a")?,
            abstract_full: parse_selector("span.abstract-full")?,
            dateline: parse_selector("p.is-size-7")?,
        })
    }
}

/// Parse a search results page. Entries without any link are skipped.
pub fn parse_listing(html: &str, page_url: &str) -> Result<Vec<Record>> {
    let selectors = ListingSelectors::new()?;
    let document = Html::parse_document(html);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (idx, item) in document.select(&selectors.result).enumerate() {
        match parse_result(&item, &selectors, page_url) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                log::warn!("Skipping search result #{}: no abstract or PDF link", idx + 1);
            }
        }
    }

    log::info!(
        "Found {} result items ({} skipped)",
        records.len() + skipped,
        skipped
    );
    Ok(records)
}

fn parse_result(item: &ElementRef, sel: &ListingSelectors, page_url: &str) -> Option<Record> {
    let title = item
        .select(&sel.title)
        .next()
        .map(|e| element_text(&e))
        .unwrap_or_default();

    let list_title = item.select(&sel.list_title).next();
    let anchors: Vec<ElementRef> = list_title
        .map(|lt| lt.select(&sel.anchor).collect())
        .unwrap_or_default();

    let landing_link = anchors
        .first()
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve(page_url, href))
        .unwrap_or_default();

    let source_link = anchors
        .iter()
        .find(|a| element_text(a).eq_ignore_ascii_case("pdf"))
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve(page_url, href))
        .or_else(|| landing_to_pdf(&landing_link))
        .unwrap_or_default();

    if landing_link.is_empty() && source_link.is_empty() {
        return None;
    }

    let authors = item
        .select(&sel.authors)
        .map(|a| element_text(&a))
        .filter(|a| !a.is_empty())
        .collect();

    let summary = item
        .select(&sel.abstract_full)
        .next()
        .map(|e| strip_less_toggle(&element_text(&e)))
        .unwrap_or_default();

    let dateline = item
        .select(&sel.dateline)
        .next()
        .map(|e| element_text(&e))
        .unwrap_or_default();

    let mut raw_metadata = BTreeMap::new();
    if !dateline.is_empty() {
        raw_metadata.insert("submitted_date_raw".to_string(), Value::String(dateline.clone()));
    }

    Some(Record {
        identity_key: String::new(),
        title,
        authors,
        summary,
        source_link,
        landing_link,
        submitted_date: parse_submitted_date(&dateline),
        raw_metadata,
    })
}

/// Collapse all text below an element into single-spaced words.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_less_toggle(text: &str) -> String {
    text.trim_end()
        .trim_end_matches("Less")
        .trim_end()
        .trim_end_matches('△')
        .trim_end()
        .to_string()
}

/// Parse `Submitted 12 August, 2025; originally announced ...` into a date.
pub fn parse_submitted_date(dateline: &str) -> Option<NaiveDate> {
    let caps = SUBMITTED_RE.as_ref()?.captures(dateline)?;
    let text = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&text, "%d %B %Y").ok()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_server::{Reply, TestServer};

    const PAGE_URL: &str = "https://arxiv.org/search/?query=cs.ai&searchtype=all";

    const SAMPLE: &str = r#"
    <html><body><ol class="breathe-horizontal">
      <li class="arxiv-result">
        <div class="is-marginless">
          <p class="list-title is-inline-block">
            <a href="https://arxiv.org/abs/2508.01234">arXiv:2508.01234</a>
            <span>&nbsp;[<a href="https://arxiv.org/pdf/2508.01234">pdf</a>, <a href="https://arxiv.org/format/2508.01234">other</a>]&nbsp;</span>
          </p>
        </div>
        <p class="title is-5 mathjax">
          Agents   that
          Plan
        </p>
        <p class="authors">
          <span class="search-hit">Authors:</span>
          <a href="/a/doe_j_1">Jane Doe</a>,
          <a href="/a/roe_r_1">Richard Roe</a>
        </p>
        <p class="abstract mathjax">
          <span class="abstract-short">We study...</span>
          <span class="abstract-full has-text-grey-dark mathjax" style="display: none;">
            We study planning agents in depth.
            <a class="is-size-7" href="javascript:void(0)">&#9651; Less</a>
          </span>
        </p>
        <p class="is-size-7"><span class="has-text-black-bis has-text-weight-semibold">Submitted</span> 12 August, 2025;
          <span class="has-text-black-bis has-text-weight-semibold">originally announced</span> August 2025.</p>
      </li>
      <li class="arxiv-result">
        <p class="list-title"><a href="/abs/2508.05678v2">arXiv:2508.05678</a></p>
        <p class="title">Second Paper</p>
      </li>
      <li class="arxiv-result">
        <p class="title">Broken entry without links</p>
      </li>
    </ol></body></html>
    "#;

    #[test]
    fn test_parse_listing_full_entry() {
        let records = parse_listing(SAMPLE, PAGE_URL).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Agents that Plan");
        assert_eq!(first.landing_link, "https://arxiv.org/abs/2508.01234");
        assert_eq!(first.source_link, "https://arxiv.org/pdf/2508.01234");
        assert_eq!(first.authors, vec!["Jane Doe", "Richard Roe"]);
        assert_eq!(first.summary, "We study planning agents in depth.");
        assert_eq!(
            first.submitted_date,
            Some(NaiveDate::from_ymd_opt(2025, 8, 12).unwrap())
        );
        assert!(first.raw_metadata.contains_key("submitted_date_raw"));
        assert!(first.identity_key.is_empty());
    }

    #[test]
    fn test_parse_listing_derives_pdf_link() {
        let records = parse_listing(SAMPLE, PAGE_URL).unwrap();
        let second = &records[1];
        assert_eq!(second.landing_link, "https://arxiv.org/abs/2508.05678v2");
        assert_eq!(second.source_link, "https://arxiv.org/pdf/2508.05678v2");
        assert!(second.authors.is_empty());
        assert_eq!(second.submitted_date, None);
    }

    #[test]
    fn test_parse_submitted_date_variants() {
        assert_eq!(
            parse_submitted_date("Submitted 3 Jan, 2024; originally announced January 2024."),
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
        assert_eq!(parse_submitted_date("originally announced 2024"), None);
    }

    #[test]
    fn test_empty_page_is_empty_batch() {
        let records = parse_listing("<html><body>No results</body></html>", PAGE_URL).unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_search_page_is_retried_after_unavailable() {
        let server = TestServer::start(vec![
            Reply::status(503),
            Reply::ok(SAMPLE.as_bytes()),
        ])
        .await;
        let listing = ArxivListing::new(server.fetcher(3), server.url("/search/?query=cs.ai"));

        let records = listing.fetch_batch().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Agents that Plan");
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_search_page_gives_up_on_not_found() {
        let server = TestServer::start(vec![Reply::status(404)]).await;
        let listing = ArxivListing::new(server.fetcher(3), server.url("/search/"));

        let err = listing.fetch_batch().await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(ref e) if !e.is_transient()));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_batch_file_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("batch.json");
        let records = parse_listing(SAMPLE, PAGE_URL).unwrap();
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let loaded = BatchFile::new(&path).fetch_batch().await.unwrap();
        assert_eq!(loaded, records);
    }
}
