// src/checker/walk.rs
// =============================================================================
// Recursive discovery of markdown files under a directory.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Finds every `.md` file under `dir`, recursively, sorted by path.
///
/// Failure to read the root propagates; it means the scan target is wrong
/// and the run should abort.
pub async fn find_markdown_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .with_context(|| format!("failed to read directory {}", current.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file()
                && path.extension().is_some_and(|ext| ext == "md")
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finds_nested_markdown_sorted() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("b.md"), "b").await.unwrap();
        tokio::fs::write(dir.path().join("a.md"), "a").await.unwrap();
        tokio::fs::write(dir.path().join("sub/c.md"), "c").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "x").await.unwrap();

        let files = find_markdown_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "sub/c.md"]);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(find_markdown_files(&missing).await.is_err());
    }
}
