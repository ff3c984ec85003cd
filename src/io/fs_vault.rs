use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::io::frontmatter::parse_frontmatter;
use crate::io::vault::{CachedMetadata, MetadataCache, Vault, VaultError, VaultFile};

/// A vault rooted at a directory on disk.
///
/// Dot-directories (`.git`, `.obsidian`, `.autotasks`) are not part of the
/// vault listing.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsVault { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a vault path
    pub fn full_path(&self, path: &str) -> PathBuf {
        path.split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Vault path of an absolute location under the root
    pub fn vault_path(&self, full: &Path) -> Option<String> {
        let relative = full.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    fn io_error(path: &str, source: io::Error) -> VaultError {
        if source.kind() == io::ErrorKind::NotFound {
            VaultError::NotFound {
                path: path.to_string(),
            }
        } else {
            VaultError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Write a file atomically: write to a temp file in the same directory,
/// then rename over the target.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn write_atomically(path: PathBuf, content: String) -> io::Result<()> {
    tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()))
        .await
        .map_err(io::Error::other)?
}

#[async_trait]
impl Vault for FsVault {
    async fn files(&self) -> Result<Vec<VaultFile>, VaultError> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| Self::io_error(&dir.display().to_string(), e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Self::io_error(&dir.display().to_string(), e))?
            {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                if file_type.is_dir() {
                    pending.push(path);
                } else if name.ends_with(".md")
                    && let Some(vault_path) = self.vault_path(&path)
                {
                    found.push(VaultFile::new(vault_path));
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    async fn file_by_path(&self, path: &str) -> Option<VaultFile> {
        let meta = tokio::fs::metadata(self.full_path(path)).await.ok()?;
        meta.is_file().then(|| VaultFile::new(path))
    }

    async fn read(&self, file: &VaultFile) -> Result<String, VaultError> {
        tokio::fs::read_to_string(self.full_path(&file.path))
            .await
            .map_err(|e| Self::io_error(&file.path, e))
    }

    async fn modify(&self, file: &VaultFile, text: &str) -> Result<(), VaultError> {
        let full = self.full_path(&file.path);
        if !tokio::fs::try_exists(&full).await.unwrap_or(false) {
            return Err(VaultError::NotFound {
                path: file.path.clone(),
            });
        }
        write_atomically(full, text.to_string())
            .await
            .map_err(|e| Self::io_error(&file.path, e))
    }

    async fn create(&self, path: &str, text: &str) -> Result<VaultFile, VaultError> {
        let full = self.full_path(path);
        if tokio::fs::try_exists(&full).await.unwrap_or(false) {
            return Err(VaultError::AlreadyExists {
                path: path.to_string(),
            });
        }
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(path, e))?;
        }
        write_atomically(full, text.to_string())
            .await
            .map_err(|e| Self::io_error(path, e))?;
        Ok(VaultFile::new(path))
    }
}

#[async_trait]
impl MetadataCache for FsVault {
    async fn file_cache(&self, file: &VaultFile) -> Option<CachedMetadata> {
        let text = self.read(file).await.ok()?;
        Some(CachedMetadata {
            frontmatter: parse_frontmatter(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vault_with_files() -> (TempDir, FsVault) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Journal")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("All Tasks.md"), "---\nkanban-plugin: board\n---\n").unwrap();
        fs::write(root.join("Journal/2024-01-02.md"), "- [ ] Task\n").unwrap();
        fs::write(root.join("Journal/photo.png"), "").unwrap();
        fs::write(root.join(".obsidian/hidden.md"), "").unwrap();
        let vault = FsVault::new(root);
        (tmp, vault)
    }

    #[tokio::test]
    async fn lists_markdown_files_outside_dot_dirs() {
        let (_tmp, vault) = vault_with_files();
        let files: Vec<String> = vault.files().await.unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(files, vec!["All Tasks.md", "Journal/2024-01-02.md"]);
    }

    #[tokio::test]
    async fn read_modify_create() {
        let (tmp, vault) = vault_with_files();
        let file = vault.file_by_path("Journal/2024-01-02.md").await.unwrap();
        assert_eq!(vault.read(&file).await.unwrap(), "- [ ] Task\n");

        vault.modify(&file, "- [x] Task\n").await.unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("Journal/2024-01-02.md")).unwrap(),
            "- [x] Task\n"
        );

        let created = vault.create("Notes/new.md", "hello").await.unwrap();
        assert_eq!(created.path, "Notes/new.md");
        assert_eq!(fs::read_to_string(tmp.path().join("Notes/new.md")).unwrap(), "hello");
        assert!(matches!(
            vault.create("Notes/new.md", "again").await,
            Err(VaultError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn missing_files() {
        let (_tmp, vault) = vault_with_files();
        assert!(vault.file_by_path("nope.md").await.is_none());
        assert!(vault.file_by_path("Journal").await.is_none());
        let ghost = VaultFile::new("ghost.md");
        assert!(matches!(vault.read(&ghost).await, Err(VaultError::NotFound { .. })));
        assert!(matches!(vault.modify(&ghost, "x").await, Err(VaultError::NotFound { .. })));
    }

    #[tokio::test]
    async fn frontmatter_from_disk() {
        let (_tmp, vault) = vault_with_files();
        let meta = vault.file_cache(&VaultFile::new("All Tasks.md")).await.unwrap();
        assert!(meta.frontmatter.is_some());
    }

    #[test]
    fn path_mapping() {
        let vault = FsVault::new("/vault");
        assert_eq!(vault.full_path("a/b.md"), PathBuf::from("/vault/a/b.md"));
        assert_eq!(vault.vault_path(Path::new("/vault/a/b.md")).as_deref(), Some("a/b.md"));
        assert_eq!(vault.vault_path(Path::new("/elsewhere/b.md")), None);
    }
}
