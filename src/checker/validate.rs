// src/checker/validate.rs
// =============================================================================
// Classifies and validates a single link, and checks one file's links in
// concurrency-capped batches.
//
// Dispatch by prefix:
// - mailto: / tel:  -> syntax validation, no network
// - javascript:     -> always reported
// - http(s)://      -> handed to the HTTP probe
// - other schemes   -> reported as unsupported
// - everything else -> local file + anchor check
//
// Local anchor sets are memoized per absolute file path for the whole run;
// nothing rewrites the files mid-run, so cached entries stay valid.
// =============================================================================

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use futures::future::join_all;
use percent_encoding::percent_decode_str;
use regex::Regex;

use super::extract::{parse_markdown_content, ExtractedLink};
use super::http::{HttpProbe, ProbeOutcome};
use super::report::BrokenLink;

/// Per-run memo of each file's valid anchors, keyed by absolute path.
#[derive(Default)]
pub struct AnchorCache {
    map: RefCell<HashMap<PathBuf, Rc<HashSet<String>>>>,
}

impl AnchorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores anchors already parsed as a side effect of link extraction,
    /// so checking a file never re-reads it.
    pub fn prime(&self, path: PathBuf, anchors: HashSet<String>) {
        self.map.borrow_mut().insert(path, Rc::new(anchors));
    }

    pub async fn anchors_for(&self, path: &Path) -> anyhow::Result<Rc<HashSet<String>>> {
        if let Some(cached) = self.map.borrow().get(path) {
            return Ok(Rc::clone(cached));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let anchors = Rc::new(parse_markdown_content(&content).anchors);
        self.map
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&anchors));
        Ok(anchors)
    }
}

/// Validates one link of any kind, relative to the file it appeared in.
pub async fn check_link<P: HttpProbe>(
    probe: &P,
    cache: &AnchorCache,
    link: &str,
    source_file: &Path,
) -> ProbeOutcome {
    if link.starts_with("mailto:") {
        return check_mailto(link);
    }

    if link.starts_with("tel:") {
        return check_tel(link);
    }

    if link.starts_with("javascript:") {
        return ProbeOutcome::broken("Unsupported javascript: link");
    }

    if link.starts_with("http://") || link.starts_with("https://") {
        return probe.check_url(link).await;
    }

    if link.contains("://") {
        return ProbeOutcome::broken("Unsupported link scheme");
    }

    check_local(cache, link, source_file).await
}

/// Every address in a mailto target (before any `?query`, comma-separated)
/// must look like `local@domain.tld`.
fn check_mailto(link: &str) -> ProbeOutcome {
    let target = &link["mailto:".len()..];
    if target.is_empty() {
        return ProbeOutcome::broken("Invalid mailto link");
    }

    let address_part = target.split('?').next().unwrap_or("");
    let addresses: Vec<&str> = address_part
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    if addresses.is_empty() {
        return ProbeOutcome::broken("Invalid mailto link");
    }

    let address_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    for address in addresses {
        if !address_re.is_match(address) {
            return ProbeOutcome::broken(format!("Invalid mailto address: {}", address));
        }
    }

    ProbeOutcome::Ok
}

/// A tel target may only contain digits and `+ ( ) . -` once whitespace is
/// stripped.
fn check_tel(link: &str) -> ProbeOutcome {
    let target: String = link["tel:".len()..]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if target.is_empty() {
        return ProbeOutcome::broken("Invalid tel link");
    }

    if !target.chars().all(|c| matches!(c, '+' | '(' | ')' | '.' | '-' | '0'..='9')) {
        return ProbeOutcome::broken("Invalid tel link");
    }

    ProbeOutcome::Ok
}

/// Local link: `path#anchor`, either part optional. An empty path means an
/// anchor in the source file itself.
async fn check_local(cache: &AnchorCache, link: &str, source_file: &Path) -> ProbeOutcome {
    let (path_part, anchor) = match link.find('#') {
        Some(idx) => (&link[..idx], &link[idx + 1..]),
        None => (link, ""),
    };

    if path_part.is_empty() {
        return check_anchor(cache, source_file, anchor).await;
    }

    let decoded = percent_decode_str(path_part)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path_part.to_string());

    let source_dir = source_file.parent().unwrap_or_else(|| Path::new("."));
    let target = source_dir.join(&decoded);

    if tokio::fs::metadata(&target).await.is_err() {
        return ProbeOutcome::broken("File not found");
    }

    check_anchor(cache, &target, anchor).await
}

/// The anchor (raw or percent-decoded spelling) must be in the target
/// file's anchor set.
async fn check_anchor(cache: &AnchorCache, file: &Path, anchor: &str) -> ProbeOutcome {
    if anchor.is_empty() {
        return ProbeOutcome::Ok;
    }

    let anchors = match cache.anchors_for(file).await {
        Ok(anchors) => anchors,
        Err(e) => return ProbeOutcome::broken(e.to_string()),
    };

    let decoded = percent_decode_str(anchor)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| anchor.to_string());

    if anchors.contains(anchor) || anchors.contains(&decoded) {
        return ProbeOutcome::Ok;
    }

    ProbeOutcome::broken(format!("Anchor not found: #{}", anchor))
}

/// Results of checking one file.
#[derive(Debug, Default)]
pub struct FileReport {
    pub links: usize,
    pub skipped: usize,
    pub broken: Vec<BrokenLink>,
}

/// Checks every link in one markdown file, `link_batch` at a time.
pub async fn check_file<P: HttpProbe>(
    probe: &P,
    cache: &AnchorCache,
    file: &Path,
    link_batch: usize,
) -> anyhow::Result<FileReport> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let parsed = parse_markdown_content(&content);
    cache.prime(file.to_path_buf(), parsed.anchors);

    let broken = check_links_batched(probe, cache, file, &parsed.links, link_batch).await;

    Ok(FileReport {
        links: parsed.links.len(),
        skipped: 0,
        broken,
    })
}

/// Fan-out/fan-in: each chunk's checks run concurrently, and the next chunk
/// only starts once the whole chunk has joined. This bounds the number of
/// in-flight HTTP requests per file.
pub async fn check_links_batched<P: HttpProbe>(
    probe: &P,
    cache: &AnchorCache,
    source_file: &Path,
    links: &[ExtractedLink],
    link_batch: usize,
) -> Vec<BrokenLink> {
    let mut broken = Vec::new();
    let batch = link_batch.max(1);

    for chunk in links.chunks(batch) {
        let checks = chunk.iter().map(|entry| async move {
            if let Some(precheck) = &entry.precheck_error {
                return Some(BrokenLink {
                    file: source_file.to_path_buf(),
                    line: entry.line,
                    link: entry.link.clone(),
                    reason: precheck.clone(),
                    rate_limited: false,
                });
            }

            match check_link(probe, cache, &entry.link, source_file).await {
                ProbeOutcome::Ok => None,
                ProbeOutcome::Broken {
                    reason,
                    rate_limited,
                } => Some(BrokenLink {
                    file: source_file.to_path_buf(),
                    line: entry.line,
                    link: entry.link.clone(),
                    reason,
                    rate_limited,
                }),
            }
        });

        broken.extend(join_all(checks).await.into_iter().flatten());
    }

    broken
}
