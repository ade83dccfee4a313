// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve a potentially relative URL against a base URL.
///
/// # Examples
/// ```
/// use harvester::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://arxiv.org/search/?query=cs.ai", "/abs/2501.12345"),
///     "https://arxiv.org/abs/2501.12345"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    let href = href.trim();
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Derive the PDF link from an arXiv landing page link.
///
/// `https://arxiv.org/abs/2501.12345v2` becomes `https://arxiv.org/pdf/2501.12345v2`.
/// Returns `None` when the link has no `/abs/` path segment.
pub fn landing_to_pdf(landing: &str) -> Option<String> {
    let mut url = Url::parse(landing).ok()?;
    let path = url.path().to_string();
    let idx = path.find("/abs/")?;
    let id = &path[idx + "/abs/".len()..];
    if id.is_empty() {
        return None;
    }
    url.set_path(&format!("{}/pdf/{}", &path[..idx], id));
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}
