use std::sync::Arc;

use tracing::{info, warn};

use crate::io::vault::{Vault, VaultError};
use crate::model::board::KanbanBoard;
use crate::model::collection::TaskCollection;
use crate::model::config::KanbanConfig;
use crate::model::origin_index::TaskOriginIndex;

/// Attach origins to board tasks written before origins were tracked.
///
/// Every source file is scanned; each task whose name is on the board gets
/// that file as an origin. The board is rewritten only if something was
/// attached. Returns the number of origins added.
pub async fn migrate_origins(
    vault: &Arc<dyn Vault>,
    board: &mut KanbanBoard,
    config: &KanbanConfig,
    index: &mut TaskOriginIndex,
) -> Result<usize, VaultError> {
    let mut added = 0;
    for file in vault.files().await? {
        if file.path == board.path() || config.is_ignored_path(&file.path) {
            continue;
        }
        let text = match vault.read(&file).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %file.path, error = %e, "skipping unreadable file");
                continue;
            }
        };
        let source = TaskCollection::parse(&text, board.config().clone(), false);
        let tasks = board.task_collection();
        for task in source.all_tasks() {
            let Some(board_task) = tasks.get_task_mut(task) else {
                continue;
            };
            if !board_task.origins.contains(&file.path) {
                board_task.add_origin(file.path.as_str());
                added += 1;
            }
            index.add_origin(&task.name, &file.path);
        }
    }

    if added > 0 {
        let text = board.render();
        let Some(board_file) = vault.file_by_path(board.path()).await else {
            return Err(VaultError::NotFound {
                path: board.path().to_string(),
            });
        };
        vault.modify(&board_file, &text).await?;
    }
    info!(added, "origin migration complete");
    Ok(added)
}
