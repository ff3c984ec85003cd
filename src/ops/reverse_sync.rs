use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::io::vault::{Vault, VaultFile};
use crate::model::origin_index::TaskOriginIndex;
use crate::model::snapshot::TaskSnapshot;
use crate::model::task::{CheckState, FormatConfig};
use crate::parse::task_parser::{DEFAULT_SPACE_UNIT, parse_task_line};

/// A board task whose completion differs from the last snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletionChange {
    pub task_name: String,
    pub is_complete: bool,
    pub origins: Vec<String>,
}

/// What one reverse pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReverseSyncReport {
    pub files_modified: usize,
    pub lines_flipped: usize,
}

/// Tasks present in both snapshots whose completion changed, in the
/// order of `current`.
pub fn find_completion_changes(
    previous: &[TaskSnapshot],
    current: &[TaskSnapshot],
) -> Vec<TaskCompletionChange> {
    let before: HashMap<&str, bool> =
        previous.iter().map(|t| (t.name.as_str(), t.complete)).collect();
    current
        .iter()
        .filter(|t| before.get(t.name.as_str()).is_some_and(|was| *was != t.complete))
        .map(|t| TaskCompletionChange {
            task_name: t.name.clone(),
            is_complete: t.complete,
            origins: t.origins.clone(),
        })
        .collect()
}

/// Rewrites checkbox marks in source files to match the board.
pub struct ReverseKanbanSynchroniser {
    vault: Arc<dyn Vault>,
    config: FormatConfig,
}

impl ReverseKanbanSynchroniser {
    pub fn new(vault: Arc<dyn Vault>, config: FormatConfig) -> Self {
        ReverseKanbanSynchroniser { vault, config }
    }

    pub async fn process(
        &self,
        changes: &[TaskCompletionChange],
        index: &TaskOriginIndex,
    ) -> ReverseSyncReport {
        let mut by_file: IndexMap<String, Vec<&TaskCompletionChange>> = IndexMap::new();
        for change in changes {
            let origins = if change.origins.is_empty() {
                index.get_origins(&change.task_name)
            } else {
                change.origins.clone()
            };
            if origins.is_empty() {
                debug!(task = %change.task_name, "no origin to update");
            }
            for path in origins {
                by_file.entry(path).or_default().push(change);
            }
        }

        let mut report = ReverseSyncReport::default();
        for (path, changes) in by_file {
            let Some(file) = self.vault.file_by_path(&path).await else {
                debug!(%path, "origin file no longer exists");
                continue;
            };
            let flipped = self.update_file(&file, &changes).await;
            if flipped > 0 {
                report.files_modified += 1;
                report.lines_flipped += flipped;
            }
        }

        if report.lines_flipped > 0 {
            info!(
                files = report.files_modified,
                lines = report.lines_flipped,
                "reverse sync complete"
            );
        }
        report
    }

    async fn update_file(&self, file: &VaultFile, changes: &[&TaskCompletionChange]) -> usize {
        let text = match self.vault.read(file).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %file.path, error = %e, "could not read origin file");
                return 0;
            }
        };

        let (updated, flipped) = flip_lines(&text, changes, &self.config);
        if flipped == 0 {
            debug!(path = %file.path, "no matching task lines");
            return 0;
        }
        if let Err(e) = self.vault.modify(file, &updated).await {
            warn!(path = %file.path, error = %e, "could not write origin file");
            return 0;
        }
        flipped
    }
}

/// Flip the checkbox of every line naming one of `changes`. Lines whose
/// mark already matches, and not-needed lines, stay as they are.
fn flip_lines(
    text: &str,
    changes: &[&TaskCompletionChange],
    config: &FormatConfig,
) -> (String, usize) {
    let mut flipped = 0;
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let Some(task) = parse_task_line(line, config, DEFAULT_SPACE_UNIT) else {
                return line.to_string();
            };
            let Some(change) = changes
                .iter()
                .find(|c| c.task_name.trim() == task.name.trim())
            else {
                return line.to_string();
            };
            let mark = match (task.state, change.is_complete) {
                (CheckState::Incomplete, true) => CheckState::Complete,
                (CheckState::Complete, false) => CheckState::Incomplete,
                _ => return line.to_string(),
            };
            // the mark sits right after `<indent>- [`
            let pos = task.indent.len() + 3;
            flipped += 1;
            format!("{}{}{}", &line[..pos], mark.checkbox_char(), &line[pos + 1..])
        })
        .collect();
    (lines.join("\n"), flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::vault::MemoryVault;
    use pretty_assertions::assert_eq;

    fn snap(name: &str, complete: bool, origins: &[&str]) -> TaskSnapshot {
        TaskSnapshot {
            name: name.into(),
            complete,
            origins: origins.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn change(name: &str, is_complete: bool, origins: &[&str]) -> TaskCompletionChange {
        TaskCompletionChange {
            task_name: name.into(),
            is_complete,
            origins: origins.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn changes_only_for_flipped_tasks_in_both() {
        let previous = vec![snap("A", false, &[]), snap("B", true, &[]), snap("Gone", false, &[])];
        let current = vec![
            snap("B", false, &["b.md"]),
            snap("A", false, &[]),
            snap("New", true, &[]),
        ];
        assert_eq!(
            find_completion_changes(&previous, &current),
            vec![change("B", false, &["b.md"])]
        );
        assert!(find_completion_changes(&[], &current).is_empty());
    }

    #[tokio::test]
    async fn flips_exactly_the_changed_line() {
        let note = "# Day\n\n- [ ] Task 1 📅 2024-01-02\n- [ ] Task 10\n- [x] Task 2\n\tnotes\n";
        let vault = Arc::new(MemoryVault::with_files([("note.md", note)]));
        let sync = ReverseKanbanSynchroniser::new(vault.clone(), FormatConfig::default());

        let report = sync
            .process(&[change("Task 1", true, &["note.md"])], &TaskOriginIndex::new())
            .await;

        assert_eq!(
            vault.contents("note.md").await.unwrap(),
            "# Day\n\n- [x] Task 1 📅 2024-01-02\n- [ ] Task 10\n- [x] Task 2\n\tnotes\n"
        );
        assert_eq!(
            report,
            ReverseSyncReport {
                files_modified: 1,
                lines_flipped: 1,
            }
        );
    }

    #[tokio::test]
    async fn falls_back_to_origin_index() {
        let vault = Arc::new(MemoryVault::with_files([
            ("a.md", "  - [x] Shared\n"),
            ("b.md", "- [x] [>] Shared\n- [n] Other\n"),
        ]));
        let mut index = TaskOriginIndex::new();
        index.add_origin("Shared", "a.md");
        index.add_origin("Shared", "b.md");
        index.add_origin("Other", "b.md");
        let config = FormatConfig::new(crate::model::task::TaskFormat::Emoji, "[>]");
        let sync = ReverseKanbanSynchroniser::new(vault.clone(), config);

        let report = sync
            .process(&[change("Shared", false, &[]), change("Other", true, &[])], &index)
            .await;

        assert_eq!(vault.contents("a.md").await.unwrap(), "  - [ ] Shared\n");
        assert_eq!(vault.contents("b.md").await.unwrap(), "- [ ] [>] Shared\n- [n] Other\n");
        assert_eq!(report.lines_flipped, 2);
    }

    #[tokio::test]
    async fn missing_and_unchanged_files_are_not_written() {
        let vault = Arc::new(MemoryVault::with_files([("a.md", "- [x] Done already\n")]));
        let sync = ReverseKanbanSynchroniser::new(vault.clone(), FormatConfig::default());

        let report = sync
            .process(
                &[
                    change("Done already", true, &["a.md"]),
                    change("Elsewhere", true, &["missing.md"]),
                ],
                &TaskOriginIndex::new(),
            )
            .await;

        assert_eq!(report, ReverseSyncReport::default());
        assert_eq!(vault.write_count("a.md").await, 0);
    }
}
