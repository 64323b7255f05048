// src/checker/extract.rs
// =============================================================================
// Extracts links and anchors from one markdown document.
//
// We use the `pulldown-cmark` crate which:
// - Parses markdown into a stream of events (heading, link, html, ...)
// - Follows the CommonMark specification
// - Reports byte offsets, which we map back to 1-based line numbers
//
// The contract is deliberately narrow: raw text in, a list of links with
// line numbers plus a set of valid in-page anchors out. Validation never
// looks at markdown itself, so this parser could be swapped out without
// touching the rest of the checker.
// =============================================================================

use std::cell::RefCell;
use std::collections::HashSet;
use std::ops::Range;

use percent_encoding::percent_decode_str;
use pulldown_cmark::{BrokenLink, CowStr, Event, Options, Parser, Tag};
use regex::Regex;

use super::slug::Slugger;

/// One link found in a document, with the 1-based line it starts on.
///
/// `precheck_error` is set when the link is already known to be broken
/// before any validation runs (an unresolved reference definition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub link: String,
    pub line: usize,
    pub precheck_error: Option<String>,
}

/// Everything the checker needs from one parsed file.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub links: Vec<ExtractedLink>,
    pub anchors: HashSet<String>,
}

/// Adds an anchor in both its raw and percent-decoded forms, so links may
/// target either spelling.
fn add_anchor(anchors: &mut HashSet<String>, raw: &str) {
    if raw.is_empty() {
        return;
    }

    anchors.insert(raw.to_string());
    if let Ok(decoded) = percent_decode_str(raw).decode_utf8() {
        if !decoded.is_empty() && decoded != raw {
            anchors.insert(decoded.into_owned());
        }
    }
}

/// Byte offsets of each line start, for offset -> line translation.
fn line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

fn line_of(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&s| s <= offset)
}

/// Parses a markdown document into its links and anchor set.
pub fn parse_markdown_content(content: &str) -> ParsedDocument {
    let starts = line_starts(content);

    let mut links: Vec<ExtractedLink> = Vec::new();
    let mut anchors: HashSet<String> = HashSet::new();
    let mut slugger = Slugger::new();

    // Reference links without a matching definition never surface as link
    // events; the callback records them so they can be reported instead of
    // silently dropped. Returning None keeps them as plain text.
    let unresolved: RefCell<Vec<(String, Range<usize>)>> = RefCell::new(Vec::new());
    let mut callback = |broken: BrokenLink<'_>| {
        unresolved
            .borrow_mut()
            .push((broken.reference.to_string(), broken.span.clone()));
        None::<(CowStr, CowStr)>
    };

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let parser =
        Parser::new_with_broken_link_callback(content, options, Some(&mut callback));

    let href_re = Regex::new(r#"(?i)\bhref\s*=\s*["']([^"']+)["']"#).unwrap();
    let src_re = Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#).unwrap();
    let id_re = Regex::new(r#"(?i)\bid\s*=\s*["']([^"']+)["']"#).unwrap();
    let name_re = Regex::new(r#"(?i)\bname\s*=\s*["']([^"']+)["']"#).unwrap();
    // Surrounding whitespace is absorbed with the token, so a mid-heading
    // anchor leaves a single separator behind.
    let explicit_re = Regex::new(r"\s*\{#([A-Za-z0-9\-_:.]+)\}\s*").unwrap();

    let mut add_link = |link: &str, line: usize| {
        let trimmed = link.trim();
        if trimmed.is_empty() {
            return;
        }
        links.push(ExtractedLink {
            link: trimmed.to_string(),
            line,
            precheck_error: None,
        });
    };

    // Heading text accumulates until the matching End event.
    let mut heading_text: Option<String> = None;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Heading(..)) => {
                heading_text = Some(String::new());
            }
            Event::End(Tag::Heading(..)) => {
                if let Some(text) = heading_text.take() {
                    // Explicit `{#id}` anchors win, and are stripped from
                    // the text before slugging what remains.
                    for cap in explicit_re.captures_iter(&text) {
                        add_anchor(&mut anchors, &cap[1]);
                    }
                    let cleaned = explicit_re.replace_all(&text, " ");
                    let cleaned = cleaned.trim();
                    if !cleaned.is_empty() {
                        add_anchor(&mut anchors, &slugger.slug(cleaned));
                    }
                }
            }
            Event::Start(Tag::Link(_, dest, _)) | Event::Start(Tag::Image(_, dest, _)) => {
                add_link(&dest, line_of(&starts, range.start));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = heading_text.as_mut() {
                    heading.push_str(&text);
                }
            }
            Event::Html(html) => {
                let line = line_of(&starts, range.start);
                for cap in href_re.captures_iter(&html) {
                    add_link(&cap[1], line);
                }
                for cap in src_re.captures_iter(&html) {
                    add_link(&cap[1], line);
                }
                for cap in id_re.captures_iter(&html) {
                    add_anchor(&mut anchors, &cap[1]);
                }
                for cap in name_re.captures_iter(&html) {
                    add_anchor(&mut anchors, &cap[1]);
                }
            }
            _ => {}
        }
    }

    for (label, span) in unresolved.into_inner() {
        links.push(ExtractedLink {
            link: format!("[{}]", label),
            line: line_of(&starts, span.start),
            precheck_error: Some("Missing link reference definition".to_string()),
        });
    }

    ParsedDocument { links, anchors }
}
