use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_yaml_ng::Mapping;
use tokio::sync::Mutex;

use crate::io::frontmatter::parse_frontmatter;

/// Error type for vault storage operations
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("file not found: {path}")]
    NotFound { path: String },
    #[error("file already exists: {path}")]
    AlreadyExists { path: String },
    #[error("could not access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A file in the vault, identified by its vault-relative `/`-separated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultFile {
    pub path: String,
}

impl VaultFile {
    pub fn new(path: impl Into<String>) -> Self {
        VaultFile { path: path.into() }
    }

    /// Final path component, e.g. `All Tasks.md`
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without the `.md` extension
    pub fn basename(&self) -> &str {
        let name = self.name();
        name.strip_suffix(".md").unwrap_or(name)
    }

    pub fn is_markdown(&self) -> bool {
        self.path.ends_with(".md")
    }
}

/// Read-modify-write step passed to [`Vault::process`]
pub type TextEdit = Box<dyn FnOnce(String) -> String + Send>;

/// File storage for the notes vault.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Every markdown file in the vault.
    async fn files(&self) -> Result<Vec<VaultFile>, VaultError>;

    async fn file_by_path(&self, path: &str) -> Option<VaultFile>;

    async fn read(&self, file: &VaultFile) -> Result<String, VaultError>;

    /// Replace a file's contents.
    async fn modify(&self, file: &VaultFile, text: &str) -> Result<(), VaultError>;

    /// Create a new file; fails if it already exists.
    async fn create(&self, path: &str, text: &str) -> Result<VaultFile, VaultError>;

    /// Apply `edit` to the file's current contents and store the result.
    async fn process(&self, file: &VaultFile, edit: TextEdit) -> Result<String, VaultError> {
        let text = self.read(file).await?;
        let updated = edit(text);
        self.modify(file, &updated).await?;
        Ok(updated)
    }
}

/// Cached per-file metadata
#[derive(Debug, Clone, Default)]
pub struct CachedMetadata {
    pub frontmatter: Option<Mapping>,
}

/// Looks up parsed metadata for vault files.
#[async_trait]
pub trait MetadataCache: Send + Sync {
    async fn file_cache(&self, file: &VaultFile) -> Option<CachedMetadata>;
}

// ---------------------------------------------------------------------------
// In-memory vault
// ---------------------------------------------------------------------------

/// A vault held in memory. Files list in insertion order.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: Mutex<IndexMap<String, String>>,
    writes: Mutex<HashMap<String, usize>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = files
            .into_iter()
            .map(|(path, text)| (path.to_string(), text.to_string()))
            .collect();
        MemoryVault {
            files: Mutex::new(map),
            writes: Mutex::new(HashMap::new()),
        }
    }

    /// Add or overwrite a file without counting it as a write.
    pub async fn insert(&self, path: &str, text: &str) {
        self.files.lock().await.insert(path.to_string(), text.to_string());
    }

    pub async fn remove(&self, path: &str) {
        self.files.lock().await.shift_remove(path);
    }

    /// Current contents of a file, if present.
    pub async fn contents(&self, path: &str) -> Option<String> {
        self.files.lock().await.get(path).cloned()
    }

    /// How many times `modify` or `create` has written to `path`.
    pub async fn write_count(&self, path: &str) -> usize {
        self.writes.lock().await.get(path).copied().unwrap_or(0)
    }

    async fn record_write(&self, path: &str) {
        *self.writes.lock().await.entry(path.to_string()).or_default() += 1;
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn files(&self) -> Result<Vec<VaultFile>, VaultError> {
        Ok(self
            .files
            .lock()
            .await
            .keys()
            .map(VaultFile::new)
            .filter(VaultFile::is_markdown)
            .collect())
    }

    async fn file_by_path(&self, path: &str) -> Option<VaultFile> {
        self.files
            .lock()
            .await
            .contains_key(path)
            .then(|| VaultFile::new(path))
    }

    async fn read(&self, file: &VaultFile) -> Result<String, VaultError> {
        self.contents(&file.path).await.ok_or_else(|| VaultError::NotFound {
            path: file.path.clone(),
        })
    }

    async fn modify(&self, file: &VaultFile, text: &str) -> Result<(), VaultError> {
        {
            let mut files = self.files.lock().await;
            let Some(slot) = files.get_mut(&file.path) else {
                return Err(VaultError::NotFound {
                    path: file.path.clone(),
                });
            };
            *slot = text.to_string();
        }
        self.record_write(&file.path).await;
        Ok(())
    }

    async fn create(&self, path: &str, text: &str) -> Result<VaultFile, VaultError> {
        {
            let mut files = self.files.lock().await;
            if files.contains_key(path) {
                return Err(VaultError::AlreadyExists {
                    path: path.to_string(),
                });
            }
            files.insert(path.to_string(), text.to_string());
        }
        self.record_write(path).await;
        Ok(VaultFile::new(path))
    }
}

#[async_trait]
impl MetadataCache for MemoryVault {
    async fn file_cache(&self, file: &VaultFile) -> Option<CachedMetadata> {
        let text = self.contents(&file.path).await?;
        Some(CachedMetadata {
            frontmatter: parse_frontmatter(&text),
        })
    }
}
