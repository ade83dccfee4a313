// src/utils/filename.rs

//! Cross-platform safe file names for per-item artifacts.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Longest stem in bytes, leaving room for an extension under the common
/// 255-byte component limit.
pub const MAX_STEM_BYTES: usize = 200;

const FORBIDDEN: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turn arbitrary text into a file stem that is valid on Linux, macOS and Windows.
pub fn sanitize_stem(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || (c.is_control() && !c.is_whitespace()) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut stem = truncate_graphemes(trim_edges(&collapsed), MAX_STEM_BYTES);
    stem = trim_edges(&stem).to_string();

    if stem.is_empty() {
        return "item".to_string();
    }

    let device = stem.split('.').next().unwrap_or("").to_ascii_uppercase();
    if RESERVED.contains(&device.as_str()) {
        stem = truncate_graphemes(&format!("_{stem}"), MAX_STEM_BYTES);
    }
    stem
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == '.' || c == ' ')
}

/// Cut `s` to at most `max_bytes` without splitting a grapheme cluster.
fn truncate_graphemes(s: &str, max_bytes: usize) -> String {
    let mut out = String::new();
    for g in s.graphemes(true) {
        if out.len() + g.len() > max_bytes {
            break;
        }
        out.push_str(g);
    }
    out
}

/// First eight hex characters of the SHA-256 of `key`.
pub fn short_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Hands out unique file names within one run.
///
/// Names are compared case-insensitively so that the result is also unique on
/// case-insensitive file systems.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    extension: String,
    used: HashSet<String>,
}

impl FilenameAllocator {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
            used: HashSet::new(),
        }
    }

    /// Allocate a name derived from `identity_key` and `title`.
    pub fn allocate(&mut self, identity_key: &str, title: &str) -> String {
        let stem = sanitize_stem(&format!("{identity_key} {title}"));

        let mut candidate = self.file_name(&stem);
        if self.used.contains(&candidate.to_lowercase()) {
            let hashed = with_suffix(&stem, &short_hash(identity_key));
            candidate = self.file_name(&hashed);

            let mut n = 2usize;
            while self.used.contains(&candidate.to_lowercase()) {
                candidate = self.file_name(&with_suffix(&hashed, &n.to_string()));
                n += 1;
            }
        }

        self.used.insert(candidate.to_lowercase());
        candidate
    }

    fn file_name(&self, stem: &str) -> String {
        if self.extension.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}.{}", self.extension)
        }
    }
}

fn with_suffix(stem: &str, suffix: &str) -> String {
    let room = MAX_STEM_BYTES.saturating_sub(suffix.len() + 1);
    let base = truncate_graphemes(stem, room);
    format!("{}-{suffix}", trim_edges(&base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_separators_and_control_characters() {
        let stem = sanitize_stem("hep-th/9901001 A\\B: C*D? \"E\" <F> |G|\u{0007}");
        assert_eq!(stem, "hep-th_9901001 A_B_ C_D_ _E_ _F_ _G__");
    }

    #[test]
    fn collapses_whitespace_and_trims_dots() {
        assert_eq!(sanitize_stem("  ..2501.00001   Deep\t\nNets..  "), "2501.00001 Deep Nets");
    }

    #[test]
    fn empty_input_gets_placeholder() {
        assert_eq!(sanitize_stem(" ... "), "item");
    }

    #[test]
    fn reserved_device_names_are_prefixed() {
        assert_eq!(sanitize_stem("con"), "_con");
        assert_eq!(sanitize_stem("LPT1.notes"), "_LPT1.notes");
        assert_eq!(sanitize_stem("console"), "console");
    }

    #[test]
    fn truncates_on_grapheme_boundaries() {
        let long = "é".repeat(300);
        let stem = sanitize_stem(&long);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(stem.chars().all(|c| c == 'é'));

        let emoji = "👩‍🔬".repeat(100);
        let stem = sanitize_stem(&emoji);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert_eq!(stem.graphemes(true).count() * "👩‍🔬".len(), stem.len());
    }

    #[test]
    fn allocator_resolves_collisions_deterministically() {
        let title = "x".repeat(400);
        let mut first = FilenameAllocator::new("txt");
        let a = first.allocate("2501.00001", &title);
        let b = first.allocate("2501.00001", &title);
        let c = first.allocate("2501.00001", &title);

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(b.contains(&short_hash("2501.00001")));
        assert!(c.ends_with("-2.txt"));
        for name in [&a, &b, &c] {
            assert!(name.len() <= MAX_STEM_BYTES + ".txt".len());
        }

        let mut second = FilenameAllocator::new(".txt");
        assert_eq!(second.allocate("2501.00001", &title), a);
        assert_eq!(second.allocate("2501.00001", &title), b);
    }

    #[test]
    fn allocator_is_case_insensitive() {
        let mut alloc = FilenameAllocator::new("txt");
        let a = alloc.allocate("k", "Title");
        let b = alloc.allocate("K", "title");
        assert_ne!(a.to_lowercase(), b.to_lowercase());
    }
}
