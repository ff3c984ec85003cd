use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::io::board_manager::{BoardError, KanbanBoardManager};
use crate::io::config_io::SettingsStore;
use crate::io::periodic::PeriodicNotes;
use crate::io::vault::{MetadataCache, Vault, VaultFile};
use crate::model::board::KanbanBoard;
use crate::model::origin_index::TaskOriginIndex;
use crate::model::snapshot::{TaskSnapshot, snapshot_collection};
use crate::ops::carry_over::CarryOver;
use crate::ops::migrate;
use crate::ops::reverse_sync::{
    ReverseKanbanSynchroniser, ReverseSyncReport, find_completion_changes,
};
use crate::ops::sync::{KanbanSynchroniser, SyncReport};
use crate::ops::watcher::{FORWARD_SYNC_GRACE, ForwardSyncFlag, SyncHandler};
use crate::parse::factory::TaskFactory;

#[derive(Default)]
struct ProviderState {
    board_path: Option<String>,
    index: TaskOriginIndex,
    previous: Vec<TaskSnapshot>,
}

/// Runs syncs against the vault's board.
///
/// Passes are serialised on an internal lock. Every public operation logs
/// its failures and carries on; none of them return errors.
pub struct KanbanProvider {
    vault: Arc<dyn Vault>,
    boards: KanbanBoardManager,
    settings: Arc<dyn SettingsStore>,
    factory: Arc<TaskFactory>,
    notes: Option<Arc<dyn PeriodicNotes>>,
    flag: ForwardSyncFlag,
    state: Mutex<ProviderState>,
}

impl KanbanProvider {
    pub fn new(
        vault: Arc<dyn Vault>,
        metadata: Arc<dyn MetadataCache>,
        settings: Arc<dyn SettingsStore>,
        factory: Arc<TaskFactory>,
    ) -> Self {
        KanbanProvider {
            boards: KanbanBoardManager::new(vault.clone(), metadata),
            vault,
            settings,
            factory,
            notes: None,
            flag: ForwardSyncFlag::new(),
            state: Mutex::new(ProviderState::default()),
        }
    }

    /// Carry tasks into new periodic notes as they are synced.
    pub fn with_periodic_notes(mut self, notes: Arc<dyn PeriodicNotes>) -> Self {
        self.notes = Some(notes);
        self
    }

    /// The flag a [`Watcher`](crate::ops::watcher::Watcher) checks before
    /// reacting to board edits.
    pub fn forward_sync_flag(&self) -> ForwardSyncFlag {
        self.flag.clone()
    }

    /// Board path: the configured file if it exists, else the first file
    /// marked as a board, else a newly created board.
    pub async fn resolve_board_path(&self) -> Result<String, BoardError> {
        let mut state = self.state.lock().await;
        self.board_path(&mut state).await
    }

    async fn board_path(&self, state: &mut ProviderState) -> Result<String, BoardError> {
        if let Some(path) = &state.board_path {
            return Ok(path.clone());
        }

        let configured = self.settings.settings().kanban.file;
        let path = if !configured.is_empty()
            && self.vault.file_by_path(&configured).await.is_some()
        {
            configured
        } else {
            if !configured.is_empty() {
                warn!(path = %configured, "configured board not found");
            }
            let file = match self.boards.resolve().await {
                Ok(file) => file,
                Err(BoardError::Resolve) => self.boards.create(&self.factory.config()).await?,
                Err(e) => return Err(e),
            };
            if let Err(e) = self.settings.remember_board_file(&file.path).await {
                warn!(error = %e, "could not store board path");
            }
            file.path
        };

        state.board_path = Some(path.clone());
        Ok(path)
    }

    async fn load_board(&self, state: &mut ProviderState) -> Result<KanbanBoard, BoardError> {
        let path = self.board_path(state).await?;
        match self.boards.get(&path, &self.factory.config()).await {
            Err(BoardError::Open { path }) => {
                // the board may have moved; look again next time
                state.board_path = None;
                Err(BoardError::Open { path })
            }
            other => other,
        }
    }

    /// Load the current board.
    pub async fn board(&self) -> Result<KanbanBoard, BoardError> {
        if !self.settings.settings().kanban.sync {
            return Err(BoardError::Disabled);
        }
        let mut state = self.state.lock().await;
        self.load_board(&mut state).await
    }

    /// Settle the dialect, then seed the origin index and the reverse-sync
    /// snapshot from the board. With sync disabled the board is left alone.
    pub async fn initialize(&self) -> bool {
        let format = self.factory.resolve().await;
        if !self.settings.settings().kanban.sync {
            debug!(?format, "kanban sync disabled, board not loaded");
            return true;
        }
        let mut state = self.state.lock().await;
        let mut board = match self.load_board(&mut state).await {
            Ok(board) => board,
            Err(e) => {
                warn!(error = %e, "could not load board");
                return false;
            }
        };
        let tasks = board.task_collection();
        state.index.build_from_tasks(tasks.all_tasks());
        state.previous = snapshot_collection(tasks);
        info!(board = %board.path(), ?format, origins = state.index.size(), "initialized");
        true
    }

    /// Forward sync `files` (the whole vault when `None`).
    pub async fn synchronise_tasks(&self, files: Option<Vec<VaultFile>>) -> Option<SyncReport> {
        let settings = self.settings.settings();
        if !settings.kanban.sync {
            debug!("kanban sync disabled");
            return None;
        }

        self.flag.begin();
        let result = async {
            let mut state = self.state.lock().await;
            let mut board = self.load_board(&mut state).await?;
            let synchroniser = KanbanSynchroniser::new(self.vault.clone(), &settings.kanban);
            let report = synchroniser.process(&mut board, files, &mut state.index).await?;
            state.previous = snapshot_collection(board.task_collection());
            Ok::<_, BoardError>(report)
        }
        .await;
        self.flag.end_after(FORWARD_SYNC_GRACE);

        match result {
            Ok(report) => Some(report),
            Err(e @ BoardError::Open { .. }) => {
                debug!(error = %e, "forward sync skipped");
                None
            }
            Err(e) => {
                warn!(error = %e, "forward sync failed");
                None
            }
        }
    }

    /// Push completion changes made on the board back to source files.
    pub async fn reverse_synchronise_tasks(&self) -> Option<ReverseSyncReport> {
        if !self.settings.settings().kanban.sync {
            debug!("kanban sync disabled");
            return None;
        }
        let mut state = self.state.lock().await;
        let mut board = match self.load_board(&mut state).await {
            Ok(board) => board,
            Err(e) => {
                debug!(error = %e, "reverse sync skipped");
                return None;
            }
        };
        let current = snapshot_collection(board.task_collection());
        let changes = find_completion_changes(&state.previous, &current);
        debug!(changes = changes.len(), "board completion changes");

        let reverse = ReverseKanbanSynchroniser::new(self.vault.clone(), self.factory.config());
        let report = reverse.process(&changes, &state.index).await;
        state.previous = current;
        Some(report)
    }

    /// Recover origins for a board written before origins were recorded.
    /// Runs once per vault; later calls return `Some(0)`. Returns `None`
    /// when sync is disabled or the pass fails.
    pub async fn migrate_origins(&self) -> Option<usize> {
        let settings = self.settings.settings();
        if !settings.kanban.sync {
            debug!("skipping origin migration, kanban sync disabled");
            return None;
        }
        if settings.kanban.origins_migrated {
            debug!("origins already migrated");
            return Some(0);
        }

        let mut state = self.state.lock().await;
        let result = async {
            let mut board = self.load_board(&mut state).await?;
            let added = migrate::migrate_origins(
                &self.vault,
                &mut board,
                &settings.kanban,
                &mut state.index,
            )
            .await?;
            state.previous = snapshot_collection(board.task_collection());
            Ok::<_, BoardError>(added)
        }
        .await;

        match result {
            Ok(added) => {
                if let Err(e) = self.settings.mark_origins_migrated().await {
                    warn!(error = %e, "could not record origin migration");
                }
                Some(added)
            }
            Err(e) => {
                warn!(error = %e, "origin migration failed");
                None
            }
        }
    }

    /// Carry tasks into `file` if it is a new periodic note.
    pub async fn carry_over(&self, file: &VaultFile) -> Option<usize> {
        let notes = self.notes.clone()?;
        let settings = self.settings.settings();

        let wants_board =
            settings.kanban.sync && (settings.daily.add_due || settings.weekly.add_due);
        let mut board = if wants_board {
            let mut state = self.state.lock().await;
            self.load_board(&mut state)
                .await
                .inspect_err(|e| debug!(error = %e, "carrying over without board"))
                .ok()
        } else {
            None
        };

        let carry = CarryOver::new(self.vault.clone(), notes, self.factory.config());
        match carry.check_and_copy(&settings, file, board.as_mut()).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(path = %file.path, error = %e, "carry-over failed");
                None
            }
        }
    }

    pub async fn previous_snapshot(&self) -> Vec<TaskSnapshot> {
        self.state.lock().await.previous.clone()
    }

    /// Replace the snapshot reverse sync diffs against, e.g. with one saved
    /// by an earlier run.
    pub async fn set_previous_snapshot(&self, snapshot: Vec<TaskSnapshot>) {
        self.state.lock().await.previous = snapshot;
    }

    pub async fn origin_index(&self) -> TaskOriginIndex {
        self.state.lock().await.index.clone()
    }
}

#[async_trait]
impl SyncHandler for KanbanProvider {
    async fn forward_sync(&self, file: VaultFile) {
        self.carry_over(&file).await;
        self.synchronise_tasks(Some(vec![file])).await;
    }

    async fn reverse_sync(&self) {
        self.reverse_synchronise_tasks().await;
    }
}
