// src/checker/report.rs
// =============================================================================
// Report types and end-of-run output for the link checker.
//
// Two output shapes:
// - Human-readable: summary block, broken links grouped by file, and a flat
//   copy-paste-friendly `file:line → link` list for quick fixing
// - JSON (--json): the same data serialized for CI tooling
// =============================================================================

use std::path::{Path, PathBuf};

use serde::Serialize;

/// One broken link as it will be reported.
///
/// `rate_limited` marks entries that only failed with HTTP 429; those get a
/// second chance in the retry pass before they count as broken.
#[derive(Debug, Clone, Serialize)]
pub struct BrokenLink {
    pub file: PathBuf,
    pub line: usize,
    pub link: String,
    pub reason: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rate_limited: bool,
}

/// Accumulated results for a whole run.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub total_files: usize,
    pub total_links: usize,
    pub skipped_links: usize,
    pub broken_links: Vec<BrokenLink>,
}

/// Path relative to the scanned source dir, for display.
pub fn relative_to(file: &Path, src_dir: &Path) -> String {
    file.strip_prefix(src_dir)
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Prints the human-readable summary and returns the number of broken links.
pub fn print_summary(result: &CheckResult, src_dir: &Path) -> usize {
    let broken = &result.broken_links;

    println!("\n{}", "=".repeat(80));
    println!("LINK CHECK SUMMARY");
    println!("{}\n", "=".repeat(80));

    println!("📁 Files checked:  {}", result.total_files);
    println!(
        "🔗 Links checked:  {}",
        result.total_links - result.skipped_links
    );
    println!("⏭️  Links skipped:  {}", result.skipped_links);
    println!("❌ Broken links:   {}", broken.len());

    if broken.is_empty() {
        println!("\n✅ All links are valid!\n");
        return 0;
    }

    println!("\n{}", "-".repeat(80));
    println!("BROKEN LINKS");
    println!("{}\n", "-".repeat(80));

    // Group by file, preserving the order entries were produced in.
    let mut order: Vec<String> = Vec::new();
    let mut by_file: std::collections::HashMap<String, Vec<&BrokenLink>> =
        std::collections::HashMap::new();
    for entry in broken {
        let relative = relative_to(&entry.file, src_dir);
        if !by_file.contains_key(&relative) {
            order.push(relative.clone());
        }
        by_file.entry(relative).or_default().push(entry);
    }

    for file in &order {
        println!("📄 {}", file);
        for entry in &by_file[file] {
            println!("   Line {}: {}", entry.line, entry.link);
            println!("   └─ Reason: {}", entry.reason);
        }
        println!();
    }

    println!("{}", "-".repeat(80));
    println!("QUICK FIX LIST (copy-paste friendly)");
    println!("{}\n", "-".repeat(80));

    for entry in broken {
        println!(
            "{}:{} → {}",
            relative_to(&entry.file, src_dir),
            entry.line,
            entry.link
        );
    }
    println!();

    broken.len()
}

/// Prints the whole result as pretty JSON.
pub fn print_json(result: &CheckResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
