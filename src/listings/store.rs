// src/listings/store.rs
// =============================================================================
// Filesystem port for the renumbering tool.
//
// The reorder/rename algorithms never touch the filesystem directly; they
// go through this trait so they can run against an in-memory double in
// tests. The disk implementation maps straight onto the book layout:
//
//   <root>/src/ch<NN>-<part>-<slug>.md        chapter documents
//   <root>/listings/ch<NN>-<topic>/           one folder per chapter
//   <root>/listings/ch<NN>-<topic>/listing_<NN>_<NN>/   one per listing,
//       each containing a Scarb.toml manifest with a `name = "..."` line
// =============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Access to chapter documents and listing folders.
pub trait BookStore {
    /// Names of all `ch*.md` files, sorted.
    async fn chapter_files(&self) -> Result<Vec<String>>;
    async fn read_chapter(&self, name: &str) -> Result<String>;
    async fn write_chapter(&self, name: &str, content: &str) -> Result<()>;

    /// Names of the per-chapter topic folders under the listings root.
    async fn topic_dirs(&self) -> Result<Vec<String>>;
    /// Names of the listing folders inside one topic folder.
    async fn listing_dirs(&self, topic: &str) -> Result<Vec<String>>;
    async fn listing_exists(&self, topic: &str, name: &str) -> Result<bool>;
    async fn rename_listing_dir(&self, topic: &str, from: &str, to: &str) -> Result<()>;
    async fn remove_listing_dir(&self, topic: &str, name: &str) -> Result<()>;

    async fn read_manifest(&self, topic: &str, listing: &str) -> Result<String>;
    async fn write_manifest(&self, topic: &str, listing: &str, content: &str) -> Result<()>;
}

/// Disk-backed store rooted at the book's `src/` and `listings/` dirs.
pub struct DiskStore {
    src_dir: PathBuf,
    listings_dir: PathBuf,
}

impl DiskStore {
    pub fn new(src_dir: PathBuf, listings_dir: PathBuf) -> Self {
        Self {
            src_dir,
            listings_dir,
        }
    }

    fn listing_path(&self, topic: &str, listing: &str) -> PathBuf {
        self.listings_dir.join(topic).join(listing)
    }

    async fn dir_names(&self, path: &PathBuf) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("failed to read directory {}", path.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl BookStore for DiskStore {
    async fn chapter_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.src_dir)
            .await
            .with_context(|| format!("failed to read {}", self.src_dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_file()
                && name.starts_with("ch")
                && name.ends_with(".md")
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read_chapter(&self, name: &str) -> Result<String> {
        let path = self.src_dir.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    async fn write_chapter(&self, name: &str, content: &str) -> Result<()> {
        let path = self.src_dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    async fn topic_dirs(&self) -> Result<Vec<String>> {
        self.dir_names(&self.listings_dir).await
    }

    async fn listing_dirs(&self, topic: &str) -> Result<Vec<String>> {
        self.dir_names(&self.listings_dir.join(topic)).await
    }

    async fn listing_exists(&self, topic: &str, name: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.listing_path(topic, name))
            .await
            .is_ok())
    }

    async fn rename_listing_dir(&self, topic: &str, from: &str, to: &str) -> Result<()> {
        let from_path = self.listing_path(topic, from);
        let to_path = self.listing_path(topic, to);
        tokio::fs::rename(&from_path, &to_path)
            .await
            .with_context(|| {
                format!(
                    "failed to rename {} to {}",
                    from_path.display(),
                    to_path.display()
                )
            })
    }

    async fn remove_listing_dir(&self, topic: &str, name: &str) -> Result<()> {
        let path = self.listing_path(topic, name);
        tokio::fs::remove_dir_all(&path)
            .await
            .with_context(|| format!("failed to remove {}", path.display()))
    }

    async fn read_manifest(&self, topic: &str, listing: &str) -> Result<String> {
        let path = self.listing_path(topic, listing).join("Scarb.toml");
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    async fn write_manifest(&self, topic: &str, listing: &str, content: &str) -> Result<()> {
        let path = self.listing_path(topic, listing).join("Scarb.toml");
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disk_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let listings = dir.path().join("listings");
        tokio::fs::create_dir_all(&src).await.unwrap();
        tokio::fs::create_dir_all(listings.join("ch04-testing/listing_04_01"))
            .await
            .unwrap();
        tokio::fs::write(src.join("ch04-00-testing.md"), "# Testing\n")
            .await
            .unwrap();
        tokio::fs::write(src.join("SUMMARY.md"), "- summary\n")
            .await
            .unwrap();
        tokio::fs::write(
            listings.join("ch04-testing/listing_04_01/Scarb.toml"),
            "name = \"listing_04_01\"\n",
        )
        .await
        .unwrap();

        let store = DiskStore::new(src, listings);

        // SUMMARY.md is not a chapter file.
        assert_eq!(store.chapter_files().await.unwrap(), vec!["ch04-00-testing.md"]);
        assert_eq!(store.topic_dirs().await.unwrap(), vec!["ch04-testing"]);
        assert_eq!(
            store.listing_dirs("ch04-testing").await.unwrap(),
            vec!["listing_04_01"]
        );
        assert!(store.listing_exists("ch04-testing", "listing_04_01").await.unwrap());

        store
            .rename_listing_dir("ch04-testing", "listing_04_01", "listing_04_02_tmp")
            .await
            .unwrap();
        assert!(store
            .listing_exists("ch04-testing", "listing_04_02_tmp")
            .await
            .unwrap());
        assert_eq!(
            store
                .read_manifest("ch04-testing", "listing_04_02_tmp")
                .await
                .unwrap(),
            "name = \"listing_04_01\"\n"
        );
    }

    #[tokio::test]
    async fn test_memory_rename_to_occupied_destination_keeps_source() {
        use test_support::MemoryStore;

        let store = MemoryStore::new();
        store.add_listing("ch04-testing", "listing_04_01");
        store.add_listing("ch04-testing", "listing_04_02");

        let result = store
            .rename_listing_dir("ch04-testing", "listing_04_01", "listing_04_02")
            .await;
        assert!(result.is_err());

        // The source survives the refused rename, manifest included.
        assert_eq!(
            store.listings_of("ch04-testing"),
            vec!["listing_04_01", "listing_04_02"]
        );
        assert!(store
            .manifest_of("ch04-testing", "listing_04_01")
            .contains("name = \"listing_04_01\""));
    }
}
