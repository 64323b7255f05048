// src/checker/slug.rs
// =============================================================================
// GitHub-style heading slugs.
//
// The site generator derives an anchor for every heading the same way GitHub
// does: lowercase, punctuation stripped, whitespace collapsed to dashes.
// Duplicate headings get a numeric suffix (-1, -2, ...) so every anchor in a
// file stays unique. The link checker has to reproduce this exactly, or it
// would flag working `#fragment` links as broken.
// =============================================================================

use std::collections::HashMap;

/// Stateful slug generator. One instance per file, so duplicate headings
/// within that file get sequential suffixes.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the anchor for a heading, suffixed if the base slug was
    /// already handed out.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, *count)
        };
        *count += 1;
        slug
    }
}

/// Lowercases and strips a heading down to its slug characters.
///
/// Letters, digits, `-` and `_` survive; each whitespace character becomes
/// a `-`; everything else is dropped. Unicode letters are kept, matching
/// GitHub.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.chars() {
        if ch.is_whitespace() {
            out.push('-');
        } else if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        }
        // Punctuation is dropped without leaving a dash behind.
    }

    out
}
