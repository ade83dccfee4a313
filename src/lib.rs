// src/lib.rs

//! arXiv harvester library: incremental, crash-safe sync of scraped papers
//! into a deduplicated ledger and a merged text corpus.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
