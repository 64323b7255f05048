// src/listings/scan.rs
// =============================================================================
// Regex-driven scanning of chapter documents.
//
// A chapter file carries captions like
//
//   <span class="caption">Listing 4-2: A test module</span>
//
// and, somewhere above each caption, an include referencing the listing's
// folder, e.g. `{{#include ../listings/ch04-testing/listing_04_02/src/lib.rs}}`.
// The include preceding a caption in document order is the folder that
// caption documents.
// =============================================================================

use regex::Regex;

use crate::util::pad2;

/// One caption occurrence within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Byte offset of the match start.
    pub start: usize,
    /// The exact matched text, for in-place replacement.
    pub text: String,
    /// Chapter number the caption declares.
    pub chapter: u32,
    /// Listing number the caption declares.
    pub number: u32,
}

/// Chapter number from a file or folder name: first `ch<digits>` component.
pub fn chapter_number(name: &str) -> Option<u32> {
    let re = Regex::new(r"ch(\d+)").unwrap();
    re.captures(name)
        .and_then(|cap| cap[1].parse().ok())
}

/// All listing captions in document order.
pub fn scan_captions(content: &str) -> Vec<Caption> {
    let re = Regex::new(r#"<span class="caption">Listing (\d+)-(\d+)"#).unwrap();
    re.captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some(Caption {
                start: whole.start(),
                text: whole.as_str().to_string(),
                chapter: cap[1].parse().ok()?,
                number: cap[2].parse().ok()?,
            })
        })
        .collect()
}

/// The last `topic/listing_NN_NN` include reference before byte offset
/// `upto`; that include belongs to the caption at `upto`.
pub fn last_include_before(content: &str, upto: usize, topic: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{}/(listing_\d+_\d+)", regex::escape(topic))).unwrap();
    re.captures_iter(&content[..upto])
        .last()
        .map(|cap| cap[1].to_string())
}

/// Canonical folder name for a listing: `listing_<NN>_<NN>`.
pub fn listing_folder_name(chapter: u32, number: u32) -> String {
    format!("listing_{}_{}", pad2(chapter), pad2(number))
}

/// Canonical caption prefix for a listing.
pub fn caption_text(chapter: u32, number: u32) -> String {
    format!("<span class=\"caption\">Listing {}-{}", chapter, number)
}

/// Rewrites captions whose declared chapter differs from `chapter`.
/// Returns the new content and the (old, new) pairs that were replaced.
pub fn fix_captions_chapter(content: &str, chapter: u32) -> (String, Vec<(String, String)>) {
    let re = Regex::new(r#"<span class="caption">Listing (\d+)-(\d+)"#).unwrap();
    let mut changes = Vec::new();

    let fixed = re
        .replace_all(content, |cap: &regex::Captures<'_>| {
            let declared: u32 = cap[1].parse().unwrap_or(chapter);
            if declared == chapter {
                return cap[0].to_string();
            }
            let replacement = format!(
                "<span class=\"caption\">Listing {}-{}",
                chapter,
                &cap[2]
            );
            changes.push((cap[0].to_string(), replacement.clone()));
            replacement
        })
        .into_owned();

    (fixed, changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_number_variants() {
        assert_eq!(chapter_number("ch04-00-testing.md"), Some(4));
        assert_eq!(chapter_number("ch12-03-some-slug.md"), Some(12));
        assert_eq!(chapter_number("ch99-topic"), Some(99));
        assert_eq!(chapter_number("appendix-01.md"), None);
    }

    #[test]
    fn test_scan_captions_in_order() {
        let content = "\
text
<span class=\"caption\">Listing 4-1: first</span>
more
<span class=\"caption\">Listing 4-3: second</span>
";
        let captions = scan_captions(content);
        assert_eq!(captions.len(), 2);
        assert_eq!((captions[0].chapter, captions[0].number), (4, 1));
        assert_eq!((captions[1].chapter, captions[1].number), (4, 3));
        assert!(captions[0].start < captions[1].start);
    }

    #[test]
    fn test_last_include_before_picks_nearest() {
        let content = "\
{{#include ../listings/ch04-testing/listing_04_01/src/lib.rs}}
<span class=\"caption\">Listing 4-1</span>
{{#include ../listings/ch04-testing/listing_04_02/src/lib.rs}}
<span class=\"caption\">Listing 4-2</span>
";
        let captions = scan_captions(content);
        assert_eq!(
            last_include_before(content, captions[1].start, "ch04-testing").as_deref(),
            Some("listing_04_02")
        );
        assert_eq!(
            last_include_before(content, captions[0].start, "ch04-testing").as_deref(),
            Some("listing_04_01")
        );
    }

    #[test]
    fn test_no_include_before_first_caption() {
        let content = "<span class=\"caption\">Listing 4-1</span>\n";
        let captions = scan_captions(content);
        assert_eq!(
            last_include_before(content, captions[0].start, "ch04-testing"),
            None
        );
    }

    #[test]
    fn test_folder_and_caption_names() {
        assert_eq!(listing_folder_name(4, 2), "listing_04_02");
        assert_eq!(caption_text(4, 2), "<span class=\"caption\">Listing 4-2");
    }

    #[test]
    fn test_fix_captions_chapter() {
        let content = "\
<span class=\"caption\">Listing 3-1: wrong chapter</span>
<span class=\"caption\">Listing 4-2: right chapter</span>
";
        let (fixed, changes) = fix_captions_chapter(content, 4);
        assert!(fixed.contains("Listing 4-1: wrong chapter"));
        assert!(fixed.contains("Listing 4-2: right chapter"));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "<span class=\"caption\">Listing 3-1");
    }
}
