use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::io::periodic::PeriodicNotes;
use crate::io::vault::{Vault, VaultError, VaultFile};
use crate::model::board::KanbanBoard;
use crate::model::collection::{DUE, PROGRESS, TaskCollection, UPCOMING};
use crate::model::config::{Periodicity, Settings};
use crate::model::task::{FormatConfig, Task};
use crate::parse::task_serializer::serialize_task;

/// Copies unfinished tasks from the previous periodic note into the
/// current one.
pub struct CarryOver {
    vault: Arc<dyn Vault>,
    notes: Arc<dyn PeriodicNotes>,
    config: FormatConfig,
}

impl CarryOver {
    pub fn new(vault: Arc<dyn Vault>, notes: Arc<dyn PeriodicNotes>, config: FormatConfig) -> Self {
        CarryOver { vault, notes, config }
    }

    /// Carry tasks into `file` for each periodicity it is the current note
    /// of. `board` supplies due tasks when `add_due` is on. Returns the
    /// number of tasks written.
    pub async fn check_and_copy(
        &self,
        settings: &Settings,
        file: &VaultFile,
        mut board: Option<&mut KanbanBoard>,
    ) -> Result<usize, VaultError> {
        let mut copied = 0;
        for periodicity in [Periodicity::Weekly, Periodicity::Daily] {
            if !settings.periodic(periodicity).carry_over {
                continue;
            }
            if self.notes.current(periodicity).await.as_ref() != Some(file) {
                continue;
            }
            copied += self
                .copy_into(settings, periodicity, file, board.as_deref_mut())
                .await?;
        }
        Ok(copied)
    }

    async fn copy_into(
        &self,
        settings: &Settings,
        periodicity: Periodicity,
        file: &VaultFile,
        board: Option<&mut KanbanBoard>,
    ) -> Result<usize, VaultError> {
        let config = settings.periodic(periodicity);
        let current = self.vault.read(file).await?;
        if TaskCollection::parse(&current, self.config.clone(), false).has_list(&config.header) {
            debug!(path = %file.path, %periodicity, "already carried over");
            return Ok(0);
        }
        let Some(previous_file) = self.notes.previous(periodicity).await else {
            debug!(%periodicity, "no previous note");
            return Ok(0);
        };
        let previous = match self.vault.read(&previous_file).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %previous_file.path, error = %e, "could not read previous note");
                return Ok(0);
            }
        };

        let headers: Vec<&str> = config.search_headers.iter().map(String::as_str).collect();
        let source = TaskCollection::parse(&previous, self.config.clone(), false);
        let mut carried: Vec<Task> = Vec::new();
        for task in source.get_tasks_from_lists(&headers) {
            if task.is_complete() || task.is_not_needed() || carried.contains(task) {
                continue;
            }
            let mut task = task.clone();
            task.filter_incomplete_children();
            task.mark_carried_over();
            if config.set_due_date {
                task.set_due_date(self.notes.today());
            }
            carried.push(task);
        }

        if config.add_due
            && let Some(board) = board
        {
            let next_start = self.notes.next_period_start(periodicity);
            let tasks = board.task_collection();
            for task in tasks.get_tasks_from_lists(&[UPCOMING, DUE, PROGRESS]) {
                let due_soon = task.due_date().is_some_and(|due| due < next_start);
                if due_soon && !carried.contains(task) {
                    let mut task = task.clone();
                    task.origins.clear();
                    carried.push(task);
                }
            }
        }

        if carried.is_empty() {
            debug!(%periodicity, "nothing to carry over");
            return Ok(0);
        }

        let mut body = String::new();
        for task in &mut carried {
            task.set_indent_level(0);
            serialize_task(task, &self.config, &mut body);
        }
        let text = format!("{}\n\n{}\n\n{}", current.trim_end_matches('\n'), config.header, body);
        self.vault.modify(file, &text).await?;

        info!(
            path = %file.path,
            from = %previous_file.path,
            count = carried.len(),
            "carried over tasks"
        );
        Ok(carried.len())
    }
}
