use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::io::vault::{Vault, VaultError, VaultFile};
use crate::model::board::KanbanBoard;
use crate::model::collection::{DONE, DUE, TaskCollection, UPCOMING};
use crate::model::config::KanbanConfig;
use crate::model::origin_index::TaskOriginIndex;
use crate::model::task::Task;

/// What one forward pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub tasks_added: usize,
    pub tasks_moved: usize,
    pub tasks_replaced: usize,
    pub tasks_archived: usize,
}

/// Where a task already on the board should end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Move(&'static str),
    Replace,
}

fn placement(task: &Task, current_list: &str) -> Placement {
    if !task.is_complete() && current_list == DONE {
        Placement::Move(if task.is_due() { DUE } else { UPCOMING })
    } else if task.is_due() && !task.is_complete() && current_list != DUE {
        Placement::Move(DUE)
    } else if task.is_complete() && current_list != DONE {
        Placement::Move(DONE)
    } else {
        Placement::Replace
    }
}

/// Copies tasks from vault files onto the board.
pub struct KanbanSynchroniser {
    vault: Arc<dyn Vault>,
    ignore_folders: KanbanConfig,
    ignore_matches: Vec<Regex>,
}

impl KanbanSynchroniser {
    /// Invalid ignore patterns are logged and left out.
    pub fn new(vault: Arc<dyn Vault>, config: &KanbanConfig) -> Self {
        let ignore_matches = config
            .ignore_matches
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(%pattern, error = %e, "ignoring invalid ignore pattern");
                    None
                }
            })
            .collect();
        KanbanSynchroniser {
            vault,
            ignore_folders: config.clone(),
            ignore_matches,
        }
    }

    /// Whether tasks with this name stay off the board.
    pub fn is_ignored_task(&self, name: &str) -> bool {
        self.ignore_matches.iter().any(|re| re.is_match(name))
    }

    /// Whether `file` feeds the board at all.
    pub fn is_source_file(&self, file: &VaultFile, board_path: &str) -> bool {
        file.path != board_path && !self.ignore_folders.is_ignored_path(&file.path)
    }

    /// Merge tasks from `files` (every vault file when `None`) into the
    /// board, archive stale completed tasks, and write the board back.
    pub async fn process(
        &self,
        board: &mut KanbanBoard,
        files: Option<Vec<VaultFile>>,
        index: &mut TaskOriginIndex,
    ) -> Result<SyncReport, VaultError> {
        let files = match files {
            Some(files) if !files.is_empty() => files,
            _ => self.vault.files().await?,
        };

        let mut report = SyncReport::default();
        for file in files {
            if !self.is_source_file(&file, board.path()) {
                continue;
            }
            match self.vault.read(&file).await {
                Ok(text) => {
                    report.files_scanned += 1;
                    self.merge_file(board, &file, &text, index, &mut report);
                }
                Err(e) => {
                    warn!(path = %file.path, error = %e, "skipping unreadable file");
                    report.files_skipped += 1;
                }
            }
        }

        report.tasks_archived = board.archive_completed();

        let text = board.render();
        let Some(board_file) = self.vault.file_by_path(board.path()).await else {
            return Err(VaultError::NotFound {
                path: board.path().to_string(),
            });
        };
        self.vault.modify(&board_file, &text).await?;

        info!(
            board = %board.path(),
            scanned = report.files_scanned,
            added = report.tasks_added,
            moved = report.tasks_moved,
            archived = report.tasks_archived,
            "forward sync complete"
        );
        Ok(report)
    }

    fn merge_file(
        &self,
        board: &mut KanbanBoard,
        file: &VaultFile,
        text: &str,
        index: &mut TaskOriginIndex,
        report: &mut SyncReport,
    ) {
        let source = TaskCollection::parse(text, board.config().clone(), false);
        let tasks = board.task_collection();

        for mut task in source.into_tasks() {
            if task.is_not_needed() {
                continue;
            }
            if self.is_ignored_task(&task.name) {
                debug!(task = %task.name, "ignored by pattern");
                continue;
            }
            task.set_indent_level(0);
            task.add_origin(file.path.as_str());
            index.add_origin(&task.name, &file.path);

            let Some(existing) = tasks.get_task(&task) else {
                debug!(task = %task.name, path = %file.path, "adding");
                if tasks.add(task, None) {
                    report.tasks_added += 1;
                }
                continue;
            };

            // origins already on the board come first
            let found_in = std::mem::replace(&mut task.origins, existing.origins.clone());
            task.origins.extend(found_in);

            match placement(&task, tasks.get_list(&task)) {
                Placement::Move(list) => {
                    debug!(task = %task.name, to = list, "moving");
                    tasks.move_task(task, list);
                    report.tasks_moved += 1;
                }
                Placement::Replace => {
                    tasks.replace(task);
                    report.tasks_replaced += 1;
                }
            }
        }
    }
}
