// src/checker/mod.rs
// =============================================================================
// Link checking: walks the book's markdown sources, validates every link
// (local file+anchor, remote HTTP, mailto/tel syntax), and reports what is
// broken.
//
// Submodules:
// - walk: markdown file discovery
// - slug: GitHub-style heading slugs
// - extract: links + anchors out of one markdown document
// - http: the HEAD/GET reachability probe
// - validate: per-link classification and per-file batched checking
// - retry: serial backoff pass for rate-limited links
// - report: result types and end-of-run output
// =============================================================================

mod extract;
mod http;
mod report;
mod retry;
mod slug;
mod validate;
mod walk;

pub use http::WebProbe;
pub use report::{print_json, print_summary, relative_to, CheckResult};
pub use retry::{retry_rate_limited, RetryPolicy};
pub use validate::{check_file, AnchorCache};
pub use walk::find_markdown_files;
