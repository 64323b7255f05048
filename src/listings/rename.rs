// src/listings/rename.rs
// =============================================================================
// Renames one listing folder and updates everything that points at it:
// the manifest's `name` field, the folder itself, and the include paths in
// the chapter's markdown files.
//
// When `staged` is set the folder lands under `<new>_tmp`: during a reorder
// several folders may swap numbers and the destination name can still be
// occupied. The staged names are committed per chapter in reorder.rs. The
// markdown references are rewritten to the final name directly; only the
// folder carries the temporary suffix.
// =============================================================================

use std::time::Duration;

use anyhow::Result;
use regex::Regex;

use super::store::BookStore;
use crate::util::{pad2, print_diff};

/// Pause after a folder rename before re-reading, to tolerate
/// eventually-consistent filesystems.
const FS_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Renames `topic/old_name` to `new_name` (or `new_name_tmp` when staged)
/// and rewrites the manifest and the chapter's markdown references.
pub async fn rename_listing<S: BookStore>(
    store: &S,
    chapter: u32,
    topic: &str,
    old_name: &str,
    new_name: &str,
    staged: bool,
) -> Result<()> {
    update_manifest_name(store, topic, old_name, new_name).await?;

    let target = if staged {
        format!("{}_tmp", new_name)
    } else {
        new_name.to_string()
    };
    store.rename_listing_dir(topic, old_name, &target).await?;

    update_markdown_references(store, chapter, old_name, new_name).await?;

    tokio::time::sleep(FS_SETTLE_DELAY).await;
    Ok(())
}

/// Rewrites the `name = "<old>"` line of the listing's manifest.
async fn update_manifest_name<S: BookStore>(
    store: &S,
    topic: &str,
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    let manifest = store.read_manifest(topic, old_name).await?;
    let re = Regex::new(&format!(
        "name = \"{}\"",
        regex::escape(old_name)
    ))
    .unwrap();
    let updated = re
        .replace_all(&manifest, format!("name = \"{}\"", new_name).as_str())
        .into_owned();
    store.write_manifest(topic, old_name, &updated).await
}

/// Replaces `listings/<topic>/<old>/` path segments with the new folder
/// name in every markdown file belonging to the chapter, printing the diff
/// of each change.
async fn update_markdown_references<S: BookStore>(
    store: &S,
    chapter: u32,
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    let chapter_prefix = format!("ch{}", pad2(chapter));
    let re = Regex::new(&format!(
        r"(listings/[^/]+/){}/",
        regex::escape(old_name)
    ))
    .unwrap();
    let replacement = format!("${{1}}{}/", new_name);

    for file in store.chapter_files().await? {
        if !file.contains(&chapter_prefix) {
            continue;
        }

        let content = store.read_chapter(&file).await?;
        let updated = re.replace_all(&content, replacement.as_str()).into_owned();
        if updated != content {
            print_diff(&content, &updated);
            store.write_chapter(&file, &updated).await?;
        }
    }

    Ok(())
}
