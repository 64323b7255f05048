// src/main.rs
// =============================================================================
// Entry point: parse the CLI, dispatch to the link checker or the listing
// tools, and exit with a meaningful code.
//
// Exit codes:
//   0 = success (no broken links / listing work finished)
//   1 = broken links found
//   2 = internal error
//
// Everything runs on a single-threaded tokio runtime: the workload is
// I/O-bound and the checker bounds its own concurrency with batches, so
// extra worker threads buy nothing and the state can stay in plain
// RefCell/Rc instead of locks.
// =============================================================================

mod checker;
mod cli;
mod listings;
mod prompt;
mod util;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use futures::future::join_all;

use cli::{Cli, Commands};
use prompt::{Prompter, TerminalPrompter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            json,
            link_batch,
            file_batch,
        } => run_check(json, link_batch, file_batch).await,
        Commands::Listings => run_listings().await,
    }
}

/// Full link-check pass over every markdown file under `<root>/src`.
async fn run_check(json: bool, link_batch: usize, file_batch: usize) -> Result<i32> {
    let root = std::env::var("LINK_CHECK_ROOT").unwrap_or_else(|_| ".".to_string());
    let src_dir = Path::new(&root).join("src");

    println!("🔍 Checking links under {}", src_dir.display());

    let files = checker::find_markdown_files(&src_dir).await?;
    if files.is_empty() {
        println!("⚠️  No markdown files found");
        return Ok(0);
    }
    println!("📄 Found {} markdown file(s)\n", files.len());

    let probe = checker::WebProbe::new()?;
    let cache = checker::AnchorCache::new();
    let mut result = checker::CheckResult {
        total_files: files.len(),
        ..Default::default()
    };

    // Files are processed in batches of `file_batch`; within a file, links
    // run in batches of `link_batch`. A file that fails to read is reported
    // and skipped, never fatal for the run.
    for chunk in files.chunks(file_batch.max(1)) {
        let reports = join_all(chunk.iter().map(|file| {
            let probe = &probe;
            let cache = &cache;
            async move { (file, checker::check_file(probe, cache, file, link_batch).await) }
        }))
        .await;

        for (file, report) in reports {
            let relative = checker::relative_to(file, &src_dir);
            match report {
                Ok(report) => {
                    if report.broken.is_empty() {
                        println!("✓ {} ({} links)", relative, report.links);
                    } else {
                        println!(
                            "❌ {} ({} links, {} broken)",
                            relative,
                            report.links,
                            report.broken.len()
                        );
                    }
                    result.total_links += report.links;
                    result.skipped_links += report.skipped;
                    result.broken_links.extend(report.broken);
                }
                Err(e) => eprintln!("⚠️  Skipping {}: {:#}", relative, e),
            }
        }
    }

    // Links that only ever answered 429 get a slow second chance before
    // they count as broken.
    if result.broken_links.iter().any(|l| l.rate_limited) {
        let outcome = checker::retry_rate_limited(
            &probe,
            &checker::RetryPolicy::default(),
            std::mem::take(&mut result.broken_links),
            &src_dir,
        )
        .await;
        result.broken_links = outcome.still_broken;
    }

    if json {
        checker::print_json(&result)?;
        return Ok(if result.broken_links.is_empty() { 0 } else { 1 });
    }

    let broken = checker::print_summary(&result, &src_dir);
    Ok(if broken > 0 { 1 } else { 0 })
}

/// Interactive listing maintenance menu.
async fn run_listings() -> Result<i32> {
    let root = std::env::var("BOOK_ROOT").unwrap_or_else(|_| ".".to_string());
    let store = listings::DiskStore::new(
        Path::new(&root).join("src"),
        Path::new(&root).join("listings"),
    );
    let mut prompter = TerminalPrompter::new();

    let choices = vec![
        "Rename a listing".to_string(),
        "Reorder listings automatically".to_string(),
    ];
    match prompter.select("What do you want to do?", &choices)? {
        Some(0) => listings::rename_interactive(&store, &mut prompter).await?,
        Some(1) => {
            listings::delete_stale_tmp(&store).await?;
            listings::fix_chapter_numbers(&store).await?;
            listings::reorder_listings(&store, &mut prompter).await?;
            println!("✅ Reordering complete");
        }
        _ => println!("Cancelled."),
    }

    Ok(0)
}
