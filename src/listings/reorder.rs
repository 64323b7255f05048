// src/listings/reorder.rs
// =============================================================================
// Keeps "Listing X-Y" captions and their backing folders numbered 1..N per
// chapter.
//
// Chapters span several files, so the expected listing number is threaded
// through the pass and reset whenever the chapter changes (files are
// processed in sorted name order, keeping a chapter's files contiguous).
// When a file's content changes, the file is rescanned with the same entry
// number: earlier edits shift downstream match positions, so a single pass
// cannot be trusted after a rewrite.
//
// Folder renames within a chapter may collide (3->4 while 4 still exists),
// so every rename is staged under a `_tmp` suffix and committed once the
// chapter is done.
// =============================================================================

use anyhow::Result;
use regex::Regex;

use super::rename::rename_listing;
use super::scan::{
    caption_text, chapter_number, fix_captions_chapter, last_include_before,
    listing_folder_name, scan_captions,
};
use super::store::BookStore;
use crate::prompt::Prompter;
use crate::util::{find_name_including, pad2, print_diff};

/// Removes `_tmp` folders left behind by an interrupted earlier run.
pub async fn delete_stale_tmp<S: BookStore>(store: &S) -> Result<()> {
    for topic in store.topic_dirs().await? {
        for listing in store.listing_dirs(&topic).await? {
            if listing.ends_with("_tmp") {
                println!("Found old tmp folder {}/{}, deleting it", topic, listing);
                store.remove_listing_dir(&topic, &listing).await?;
            }
        }
    }
    Ok(())
}

/// Commits staged renames: strips the `_tmp` suffix from every staged
/// folder, removing whatever occupies the destination name first.
pub async fn commit_staged_renames<S: BookStore>(store: &S) -> Result<()> {
    for topic in store.topic_dirs().await? {
        for listing in store.listing_dirs(&topic).await? {
            let Some(final_name) = listing.strip_suffix("_tmp") else {
                continue;
            };

            if store.listing_exists(&topic, final_name).await? {
                store.remove_listing_dir(&topic, final_name).await?;
            }

            match store.rename_listing_dir(&topic, &listing, final_name).await {
                Ok(()) => println!("Renamed {}/{} to {}/{}", topic, listing, topic, final_name),
                Err(e) => eprintln!("Error renaming folder {}/{}: {:#}", topic, listing, e),
            }
        }
    }
    Ok(())
}

/// Non-interactive pre-pass: rewrites captions whose declared chapter
/// number disagrees with the file's chapter number.
pub async fn fix_chapter_numbers<S: BookStore>(store: &S) -> Result<()> {
    for file in store.chapter_files().await? {
        let Some(chapter) = chapter_number(&file) else {
            println!("Warning: File {} doesn't match expected format (chX.md)", file);
            continue;
        };

        let content = store.read_chapter(&file).await?;
        let (fixed, changes) = fix_captions_chapter(&content, chapter);
        if changes.is_empty() {
            continue;
        }

        store.write_chapter(&file, &fixed).await?;
        println!("Updated captions in file: {}", file);
        for (old, new) in changes {
            println!("Replaced: \"{}\" with \"{}\"", old, new);
        }
    }
    Ok(())
}

/// Full sequential renumbering pass over every chapter.
pub async fn reorder_listings<S: BookStore, P: Prompter>(
    store: &S,
    prompter: &mut P,
) -> Result<()> {
    let files = store.chapter_files().await?;

    let mut expected = 1u32;
    let mut current_chapter = 0u32;

    for file in files {
        let Some(chapter) = chapter_number(&file) else {
            println!("Warning: File {} doesn't match expected format (chX.md)", file);
            continue;
        };

        if chapter != current_chapter {
            // Close out the previous chapter before its numbers go stale.
            commit_staged_renames(store).await?;
            current_chapter = chapter;
            expected = 1;
        }

        loop {
            let (updated, next) =
                process_file(store, prompter, &file, chapter, expected).await?;
            if !updated {
                expected = next;
                break;
            }
            // Content changed: rescan with the same entry number.
        }
    }

    commit_staged_renames(store).await
}

/// Checks one file's captions against the expected sequence. Returns
/// whether the file changed and the next expected listing number.
///
/// Stops at the first caption it rewrites; the caller rescans, because the
/// rewrite shifted every downstream match position.
async fn process_file<S: BookStore, P: Prompter>(
    store: &S,
    prompter: &mut P,
    file: &str,
    chapter: u32,
    start_expected: u32,
) -> Result<(bool, u32)> {
    let topics = store.topic_dirs().await?;
    let chapter_key = format!("ch{}", pad2(chapter));
    let Some(topic) = find_name_including(&topics, &chapter_key) else {
        println!("Warning: No listings folder found for chapter {}", chapter);
        return Ok((false, start_expected));
    };
    let topic = topic.to_string();

    let content = store.read_chapter(file).await?;
    let mut expected = start_expected;

    for caption in scan_captions(&content) {
        if caption.number == expected {
            expected += 1;
            continue;
        }

        let Some(include_name) = last_include_before(&content, caption.start, &topic) else {
            println!(
                "Warning: No include found for listing {} in file {}",
                caption.number, file
            );
            expected += 1;
            continue;
        };

        // The include may still carry a name from earlier in this pass;
        // what matters is the folder currently on disk.
        let listing_dirs = store.listing_dirs(&topic).await?;
        let Some(old_name) = find_name_including(&listing_dirs, &include_name) else {
            println!("No folder found including string: {}", include_name);
            expected += 1;
            continue;
        };
        let old_name = old_name.to_string();
        let new_name = listing_folder_name(chapter, expected);

        let message = format!(
            "Listing {}-{} in file {} should be Listing {}-{}.\n\
             Rename and move source from {} to {}?",
            caption.chapter, caption.number, file, chapter, expected, old_name, new_name
        );
        if !prompter.confirm(&message)? {
            expected += 1;
            continue;
        }

        if let Err(e) =
            rename_listing(store, chapter, &topic, &old_name, &new_name, true).await
        {
            eprintln!("Warning: failed to rename {}: {:#}", old_name, e);
            expected += 1;
            continue;
        }

        // The rename rewrote include paths on disk; start from the fresh
        // content before touching the caption. The caption is replaced at
        // its recorded position: during a swap the same caption text can
        // appear earlier in the document on a caption that is already
        // correct.
        let mut content = store.read_chapter(file).await?;
        let new_caption = caption_text(chapter, expected);
        content = replace_near(&content, &caption.text, &new_caption, caption.start);

        // Other prose mentions of the old number ("see Listing 4-3") are
        // offered as a follow-up with their own confirmation.
        let mention = format!("Listing {}-{}", caption.chapter, caption.number);
        let mention_re = Regex::new(&regex::escape(&mention)).unwrap();
        let with_mentions = mention_re
            .replace_all(&content, format!("Listing {}-{}", chapter, expected).as_str())
            .into_owned();
        if with_mentions != content {
            print_diff(&content, &with_mentions);
            if prompter.confirm("Found a reference. Do you want to rename it?")? {
                content = with_mentions;
            } else {
                println!("Change skipped.");
            }
        }

        store.write_chapter(file, &content).await?;
        expected += 1;
        return Ok((true, expected));
    }

    Ok((false, expected))
}

/// Replaces the occurrence of `needle` whose byte offset is closest to
/// `near`. Include-path rewrites leave caption offsets essentially stable,
/// so the recorded match position still identifies the right occurrence.
fn replace_near(content: &str, needle: &str, replacement: &str, near: usize) -> String {
    let Some(pos) = content
        .match_indices(needle)
        .map(|(p, _)| p)
        .min_by_key(|p| p.abs_diff(near))
    else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len() + replacement.len());
    out.push_str(&content[..pos]);
    out.push_str(replacement);
    out.push_str(&content[pos + needle.len()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::store::test_support::MemoryStore;
    use crate::prompt::test_support::ScriptedPrompter;

    fn caption_numbers(content: &str) -> Vec<(u32, u32)> {
        scan_captions(content)
            .into_iter()
            .map(|c| (c.chapter, c.number))
            .collect()
    }

    fn chapter_with(listings: &[u32]) -> String {
        let mut out = String::new();
        for n in listings {
            out.push_str(&format!(
                "{{{{#include ../listings/ch04-testing/listing_04_{:02}/src/lib.rs}}}}\n\
                 <span class=\"caption\">Listing 4-{}: example</span>\n\n",
                n, n
            ));
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_gapped_numbers_become_sequential() {
        let store = MemoryStore::new();
        // Captions 2 and 3 should be 1 and 2.
        store.add_chapter("ch04-00-testing.md", &chapter_with(&[2, 3]));
        store.add_listing("ch04-testing", "listing_04_02");
        store.add_listing("ch04-testing", "listing_04_03");

        let mut prompter = ScriptedPrompter::always(true);
        reorder_listings(&store, &mut prompter).await.unwrap();

        let content = store.chapter("ch04-00-testing.md");
        assert_eq!(caption_numbers(&content), vec![(4, 1), (4, 2)]);
        assert!(content.contains("listings/ch04-testing/listing_04_01/"));
        assert!(content.contains("listings/ch04-testing/listing_04_02/"));

        let folders = store.listings_of("ch04-testing");
        assert_eq!(folders, vec!["listing_04_01", "listing_04_02"]);
        assert!(store
            .manifest_of("ch04-testing", "listing_04_01")
            .contains("name = \"listing_04_01\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_correct_content_is_untouched() {
        let store = MemoryStore::new();
        let original = chapter_with(&[1, 2]);
        store.add_chapter("ch04-00-testing.md", &original);
        store.add_listing("ch04-testing", "listing_04_01");
        store.add_listing("ch04-testing", "listing_04_02");

        let mut prompter = ScriptedPrompter::always(true);
        reorder_listings(&store, &mut prompter).await.unwrap();

        assert_eq!(store.chapter("ch04-00-testing.md"), original);
        // Nothing was even proposed.
        assert!(prompter.messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_swapped_folders_survive_via_staging() {
        let store = MemoryStore::new();
        // Captions out of order: 2 first, then 1. The folders have to swap
        // numbers without clobbering each other.
        let content = "\
{{#include ../listings/ch04-testing/listing_04_02/src/lib.rs}}
<span class=\"caption\">Listing 4-2: first</span>

{{#include ../listings/ch04-testing/listing_04_01/src/lib.rs}}
<span class=\"caption\">Listing 4-1: second</span>
";
        store.add_chapter("ch04-00-testing.md", content);
        store.add_listing("ch04-testing", "listing_04_01");
        store.add_listing("ch04-testing", "listing_04_02");

        // Two renames confirmed; the follow-up "reference" prompt fires
        // because "Listing 4-1" also matches the first caption, which was
        // just fixed. Declining keeps that caption intact.
        let mut prompter = ScriptedPrompter {
            confirmations: std::collections::VecDeque::from(vec![true, true, false]),
            inputs: std::collections::VecDeque::new(),
            selections: std::collections::VecDeque::new(),
            messages: Vec::new(),
        };
        reorder_listings(&store, &mut prompter).await.unwrap();

        let chapter = store.chapter("ch04-00-testing.md");
        assert_eq!(caption_numbers(&chapter), vec![(4, 1), (4, 2)]);

        // Both folders exist, correctly numbered, no _tmp leftovers and no
        // duplicates.
        let folders = store.listings_of("ch04-testing");
        assert_eq!(folders, vec!["listing_04_01", "listing_04_02"]);
        for folder in &folders {
            assert!(store
                .manifest_of("ch04-testing", folder)
                .contains(&format!("name = \"{}\"", folder)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_numbering_resets_per_chapter() {
        let store = MemoryStore::new();
        store.add_chapter("ch04-00-testing.md", &chapter_with(&[1]));
        store.add_chapter(
            "ch05-00-other.md",
            "{{#include ../listings/ch05-other/listing_05_02/src/lib.rs}}\n\
             <span class=\"caption\">Listing 5-2: misnumbered</span>\n",
        );
        store.add_listing("ch04-testing", "listing_04_01");
        store.add_listing("ch05-other", "listing_05_02");

        let mut prompter = ScriptedPrompter::always(true);
        reorder_listings(&store, &mut prompter).await.unwrap();

        assert_eq!(
            caption_numbers(&store.chapter("ch05-00-other.md")),
            vec![(5, 1)]
        );
        assert_eq!(store.listings_of("ch05-other"), vec!["listing_05_01"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_rename_changes_nothing() {
        let store = MemoryStore::new();
        let original = chapter_with(&[2]);
        store.add_chapter("ch04-00-testing.md", &original);
        store.add_listing("ch04-testing", "listing_04_02");

        let mut prompter = ScriptedPrompter::always(false);
        reorder_listings(&store, &mut prompter).await.unwrap();

        assert_eq!(store.chapter("ch04-00-testing.md"), original);
        assert_eq!(store.listings_of("ch04-testing"), vec!["listing_04_02"]);
        // The change was proposed exactly once.
        assert_eq!(prompter.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caption_without_include_is_skipped() {
        let store = MemoryStore::new();
        let original = "<span class=\"caption\">Listing 4-7: no include above</span>\n";
        store.add_chapter("ch04-00-testing.md", original);
        store.add_listing("ch04-testing", "listing_04_01");

        let mut prompter = ScriptedPrompter::always(true);
        reorder_listings(&store, &mut prompter).await.unwrap();

        assert_eq!(store.chapter("ch04-00-testing.md"), original);
        assert!(prompter.messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_listings_folder_skips_chapter() {
        let store = MemoryStore::new();
        let original = chapter_with(&[2]);
        store.add_chapter("ch04-00-testing.md", &original);
        // No ch04 topic folder at all.
        store.add_listing("ch09-unrelated", "listing_09_01");

        let mut prompter = ScriptedPrompter::always(true);
        reorder_listings(&store, &mut prompter).await.unwrap();

        assert_eq!(store.chapter("ch04-00-testing.md"), original);
    }

    #[test]
    fn test_replace_near_picks_closest_occurrence() {
        let content = "Listing 4-1 ... Listing 4-1 ...";
        let replaced = replace_near(content, "Listing 4-1", "Listing 4-2", 16);
        assert_eq!(replaced, "Listing 4-1 ... Listing 4-2 ...");
        // No occurrence at all leaves the content alone.
        assert_eq!(replace_near(content, "Listing 9-9", "x", 0), content);
    }

    #[tokio::test]
    async fn test_fix_chapter_numbers_matches_filename() {
        let store = MemoryStore::new();
        store.add_chapter(
            "ch04-00-testing.md",
            "<span class=\"caption\">Listing 3-1: stale chapter</span>\n\
             <span class=\"caption\">Listing 4-2: fine</span>\n",
        );

        fix_chapter_numbers(&store).await.unwrap();

        let content = store.chapter("ch04-00-testing.md");
        assert_eq!(caption_numbers(&content), vec![(4, 1), (4, 2)]);
    }

    #[tokio::test]
    async fn test_stale_tmp_folders_deleted_before_run() {
        let store = MemoryStore::new();
        store.add_listing("ch04-testing", "listing_04_01");
        store.add_listing("ch04-testing", "listing_04_02_tmp");

        delete_stale_tmp(&store).await.unwrap();

        assert_eq!(store.listings_of("ch04-testing"), vec!["listing_04_01"]);
    }

    #[tokio::test]
    async fn test_commit_overwrites_occupied_destination() {
        let store = MemoryStore::new();
        store.add_listing("ch04-testing", "listing_04_01");
        store.add_listing("ch04-testing", "listing_04_01_tmp");

        commit_staged_renames(&store).await.unwrap();

        assert_eq!(store.listings_of("ch04-testing"), vec!["listing_04_01"]);
    }
}
