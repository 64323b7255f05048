// src/listings/mod.rs
// =============================================================================
// Listing renumbering: keeps "Listing X-Y" captions and their
// `listing_NN_NN` source folders sequential within each chapter, and offers
// a fuzzy-search rename for one-off fixes.
// =============================================================================

pub mod rename;
pub mod reorder;
pub mod scan;
pub mod search;
pub mod store;

pub use reorder::{delete_stale_tmp, fix_chapter_numbers, reorder_listings};
pub use search::rename_interactive;
pub use store::DiskStore;
