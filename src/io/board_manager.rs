use std::sync::Arc;

use tracing::{debug, info};

use crate::io::frontmatter::frontmatter_str;
use crate::io::vault::{MetadataCache, Vault, VaultError, VaultFile};
use crate::model::board::{
    BOARD_PROPERTY_NAME, BOARD_PROPERTY_VALUE, DEFAULT_BOARD_NAME, KanbanBoard,
};
use crate::model::task::FormatConfig;

/// Error type for locating and loading the board
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board cannot be opened: {path}")]
    Open { path: String },
    #[error("no board found: no file has `kanban-plugin: board` frontmatter")]
    Resolve,
    #[error("kanban sync is disabled")]
    Disabled,
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Finds, creates and loads the board file.
#[derive(Clone)]
pub struct KanbanBoardManager {
    vault: Arc<dyn Vault>,
    metadata: Arc<dyn MetadataCache>,
}

impl KanbanBoardManager {
    pub fn new(vault: Arc<dyn Vault>, metadata: Arc<dyn MetadataCache>) -> Self {
        KanbanBoardManager { vault, metadata }
    }

    /// Whether the file's frontmatter marks it as a board.
    pub async fn is_valid(&self, file: &VaultFile) -> bool {
        let Some(cache) = self.metadata.file_cache(file).await else {
            return false;
        };
        cache
            .frontmatter
            .as_ref()
            .and_then(|fm| frontmatter_str(fm, BOARD_PROPERTY_NAME))
            .is_some_and(|value| value == BOARD_PROPERTY_VALUE)
    }

    /// The first vault file marked as a board.
    pub async fn resolve(&self) -> Result<VaultFile, BoardError> {
        for file in self.vault.files().await? {
            if self.is_valid(&file).await {
                debug!(path = %file.path, "resolved board");
                return Ok(file);
            }
        }
        Err(BoardError::Resolve)
    }

    /// Write an empty board to `All Tasks.md` at the vault root.
    pub async fn create(&self, config: &FormatConfig) -> Result<VaultFile, BoardError> {
        let path = format!("{}.md", DEFAULT_BOARD_NAME);
        let mut board = KanbanBoard::new(path.clone(), None, config.clone());
        let file = self.vault.create(&path, &board.render()).await?;
        info!(path = %file.path, "created board");
        Ok(file)
    }

    /// Load the board at `path`.
    pub async fn get(&self, path: &str, config: &FormatConfig) -> Result<KanbanBoard, BoardError> {
        let Some(file) = self.vault.file_by_path(path).await else {
            return Err(BoardError::Open {
                path: path.to_string(),
            });
        };
        let contents = self.vault.read(&file).await?;
        Ok(KanbanBoard::new(file.path, Some(contents), config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::vault::MemoryVault;
    use crate::model::board::HEADER;

    fn manager(vault: &Arc<MemoryVault>) -> KanbanBoardManager {
        KanbanBoardManager::new(vault.clone(), vault.clone())
    }

    #[tokio::test]
    async fn resolve_finds_board_by_frontmatter() {
        let vault = Arc::new(MemoryVault::with_files([
            ("note.md", "- [ ] Task"),
            ("other.md", "---\nkanban-plugin: basic\n---\n"),
            ("Boards/Tasks.md", "---\n\nkanban-plugin: board\n\n---\n"),
        ]));
        let file = manager(&vault).resolve().await.unwrap();
        assert_eq!(file.path, "Boards/Tasks.md");
    }

    #[tokio::test]
    async fn resolve_without_board_fails() {
        let vault = Arc::new(MemoryVault::with_files([("note.md", "- [ ] Task")]));
        assert!(matches!(manager(&vault).resolve().await, Err(BoardError::Resolve)));
    }

    #[tokio::test]
    async fn create_writes_default_board() {
        let vault = Arc::new(MemoryVault::new());
        let m = manager(&vault);
        let file = m.create(&FormatConfig::default()).await.unwrap();
        assert_eq!(file.path, "All Tasks.md");
        let text = vault.contents("All Tasks.md").await.unwrap();
        assert!(text.starts_with(HEADER));
        assert!(m.is_valid(&file).await);
        assert!(m.create(&FormatConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn get_missing_board_is_open_error() {
        let vault = Arc::new(MemoryVault::new());
        let err = manager(&vault).get("All Tasks.md", &FormatConfig::default()).await.unwrap_err();
        assert!(matches!(err, BoardError::Open { .. }));
    }

    #[tokio::test]
    async fn get_loads_tasks() {
        let vault = Arc::new(MemoryVault::with_files([(
            "All Tasks.md",
            "---\n\nkanban-plugin: board\n\n---\n\n## Due\n\n- [ ] Pay rent\n",
        )]));
        let mut board = manager(&vault)
            .get("All Tasks.md", &FormatConfig::default())
            .await
            .unwrap();
        assert_eq!(board.path(), "All Tasks.md");
        assert!(board.task_collection().get_task_by_name("Pay rent").is_some());
    }
}
