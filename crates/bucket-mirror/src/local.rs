//! Local fixture tree enumeration

use crate::error::{MirrorError, MirrorResult};
use std::path::{Component, Path, PathBuf};

/// A local file and the object key it is uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalObject {
    pub key: String,
    pub path: PathBuf,
}

/// Object key for `path` relative to `root`, with `/` separators.
///
/// Returns `None` if `path` is not under `root` or is not valid UTF-8.
pub fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// List every file under `root`, recursively, sorted by key.
///
/// Directories produce no entries; symlinks are followed.
pub async fn list_files_recursive(root: &Path) -> MirrorResult<Vec<LocalObject>> {
    let mut results = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| MirrorError::local(&dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MirrorError::local(&dir, e))?
        {
            let entry_path = entry.path();
            let metadata = tokio::fs::metadata(&entry_path)
                .await
                .map_err(|e| MirrorError::local(&entry_path, e))?;

            if metadata.is_dir() {
                pending.push(entry_path);
            } else if metadata.is_file() {
                let key = object_key(root, &entry_path).ok_or_else(|| {
                    MirrorError::local(
                        &entry_path,
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "path cannot be used as an object key",
                        ),
                    )
                })?;
                results.push(LocalObject {
                    key,
                    path: entry_path,
                });
            }
        }
    }

    // Sort for consistent ordering
    results.sort_by(|a, b| a.key.cmp(&b.key));

    tracing::debug!(
        "Listed {} files under fixture directory: {}",
        results.len(),
        root.display()
    );

    Ok(results)
}

/// Names of the immediate subdirectories of `root`, sorted.
pub async fn list_subdirectories(root: &Path) -> MirrorResult<Vec<String>> {
    let mut names = Vec::new();

    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|e| MirrorError::local(root, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MirrorError::local(root, e))?
    {
        let entry_path = entry.path();
        let metadata = tokio::fs::metadata(&entry_path)
            .await
            .map_err(|e| MirrorError::local(&entry_path, e))?;
        if !metadata.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_object_key_uses_forward_slashes() {
        let root = Path::new("/fixtures/s3/assets");
        let path = root.join("images").join("logo.png");
        assert_eq!(object_key(root, &path).as_deref(), Some("images/logo.png"));
    }

    #[test]
    fn test_object_key_outside_root() {
        assert_eq!(
            object_key(Path::new("/fixtures/a"), Path::new("/fixtures/b/x")),
            None
        );
        assert_eq!(object_key(Path::new("/fixtures/a"), Path::new("/fixtures/a")), None);
    }

    #[tokio::test]
    async fn test_list_files_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("readme.txt"), "top").unwrap();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a/one.json"), "1").unwrap();
        std::fs::write(root.join("a/b/two.bin"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(root.join("empty")).unwrap();

        let files = list_files_recursive(root).await.unwrap();
        let keys: Vec<_> = files.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["a/b/two.bin", "a/one.json", "readme.txt"]);
        assert!(files[0].path.ends_with("a/b/two.bin"));
    }

    #[tokio::test]
    async fn test_list_files_recursive_empty() {
        let temp_dir = TempDir::new().unwrap();
        let files = list_files_recursive(temp_dir.path()).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_subdirectories_skips_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("uploads")).unwrap();
        std::fs::create_dir(temp_dir.path().join("avatars")).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        let dirs = list_subdirectories(temp_dir.path()).await.unwrap();
        assert_eq!(dirs, vec!["avatars", "uploads"]);
    }

    #[tokio::test]
    async fn test_list_not_found() {
        let result = list_files_recursive(Path::new("/nonexistent/path")).await;
        assert!(matches!(result, Err(MirrorError::LocalFile { .. })));
    }
}
