// src/services/extract.rs

//! Text extraction from fetched documents.

use lopdf::Document;

use crate::error::ExtractError;

/// Capability to turn document bytes into plain text.
pub trait Extractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// How far into a payload the `%PDF-` header may start.
const MAGIC_WINDOW: usize = 1024;

/// Whether `bytes` look like a PDF.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(MAGIC_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// PDF extractor backed by `lopdf`.
///
/// Pages are extracted one by one in page order; a page that fails is logged
/// and skipped so that one damaged page does not lose the whole paper.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if !looks_like_pdf(bytes) {
            let head: String = String::from_utf8_lossy(&bytes[..bytes.len().min(16)])
                .chars()
                .filter(|c| !c.is_control())
                .collect();
            return Err(ExtractError::UnsupportedFormat(format!(
                "missing %PDF- header (starts with {head:?})"
            )));
        }

        let document = Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Err(ExtractError::Empty);
        }

        let mut text = String::new();
        let mut failed_pages = 0usize;
        for page in &pages {
            match document.extract_text(&[*page]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(e) => {
                    failed_pages += 1;
                    log::debug!("Skipping page {}: {}", page, e);
                }
            }
        }

        if failed_pages == pages.len() {
            return Err(ExtractError::Pdf(format!(
                "text extraction failed on all {} page(s)",
                pages.len()
            )));
        }
        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}
