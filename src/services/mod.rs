//! Service layer for the harvester.
//!
//! This module contains the collaborators the sync engine talks to:
//! - Listing sources producing a batch (`ArxivListing`, `BatchFile`)
//! - Document fetching with pacing and retry (`HttpFetcher`)
//! - Text extraction (`PdfExtractor`)

mod extract;
mod fetch;
mod listing;
#[cfg(test)]
mod test_server;

pub use extract::{Extractor, PdfExtractor, looks_like_pdf};
pub use fetch::{Fetcher, HttpFetcher, Pacer, RetryPolicy, is_transient_status};
pub use listing::{ArxivListing, BatchFile, ListingSource, parse_listing, parse_submitted_date};
