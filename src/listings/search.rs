// src/listings/search.rs
// =============================================================================
// Interactive one-off rename: fuzzy-find a listing folder, ask for the new
// name, and apply the rename immediately (no staging, since a single rename
// cannot collide with itself).
// =============================================================================

use anyhow::Result;

use super::rename::rename_listing;
use super::scan::chapter_number;
use super::store::BookStore;
use crate::prompt::{fuzzy_top, Prompter};

const MAX_MATCHES: usize = 10;

/// Prompts for a search term, offers the closest `topic/listing` matches,
/// and renames the picked folder to a user-supplied name.
pub async fn rename_interactive<S: BookStore, P: Prompter>(
    store: &S,
    prompter: &mut P,
) -> Result<()> {
    let mut candidates = Vec::new();
    for topic in store.topic_dirs().await? {
        for listing in store.listing_dirs(&topic).await? {
            candidates.push(format!("{}/{}", topic, listing));
        }
    }
    if candidates.is_empty() {
        println!("No listings found.");
        return Ok(());
    }

    let needle = prompter.input("Search for a listing:")?;
    let matches: Vec<String> = fuzzy_top(&needle, &candidates, MAX_MATCHES)
        .into_iter()
        .map(str::to_string)
        .collect();
    if matches.is_empty() {
        println!("No listing matches \"{}\".", needle);
        return Ok(());
    }

    let Some(index) = prompter.select("Which listing?", &matches)? else {
        println!("Cancelled.");
        return Ok(());
    };
    let picked = &matches[index];
    let (topic, old_name) = picked
        .split_once('/')
        .ok_or_else(|| anyhow::anyhow!("malformed listing entry {}", picked))?;

    let Some(chapter) = chapter_number(topic) else {
        println!("Warning: folder {} has no chapter number.", topic);
        return Ok(());
    };

    let new_name = prompter.input("New folder name:")?;
    if new_name.is_empty() || new_name == old_name {
        println!("Nothing to do.");
        return Ok(());
    }
    if store.listing_exists(topic, &new_name).await? {
        println!("A folder named {} already exists.", new_name);
        return Ok(());
    }

    let message = format!("Rename {}/{} to {}/{}?", topic, old_name, topic, new_name);
    if !prompter.confirm(&message)? {
        println!("Cancelled.");
        return Ok(());
    }

    rename_listing(store, chapter, topic, old_name, &new_name, false).await?;
    println!("Renamed {}/{} to {}/{}", topic, old_name, topic, new_name);
    Ok(())
}
