// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Two subcommands:
// - check:    validate every link in the book's markdown sources
// - listings: interactive listing renumbering and renames
// =============================================================================

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "book-keeper",
    version,
    about = "Maintenance tools for an mdBook-style documentation book",
    long_about = "book-keeper keeps a documentation book healthy: it validates every \
                  link in the markdown sources (local files, anchors, HTTP, mailto, tel) \
                  and keeps listing captions and their source folders numbered sequentially."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every link in the book's markdown sources
    ///
    /// Scans <root>/src for .md files; the root comes from the
    /// LINK_CHECK_ROOT environment variable and defaults to the current
    /// directory. Exits 1 when broken links are found.
    Check {
        /// Output results as JSON instead of the human-readable summary
        #[arg(long)]
        json: bool,

        /// How many links are checked concurrently within one file
        #[arg(long, default_value_t = 20)]
        link_batch: usize,

        /// How many files are processed concurrently
        #[arg(long, default_value_t = 10)]
        file_batch: usize,
    },

    /// Interactively rename or renumber listing folders
    ///
    /// Works on <root>/src and <root>/listings; the root comes from the
    /// BOOK_ROOT environment variable and defaults to the current directory.
    Listings,
}
