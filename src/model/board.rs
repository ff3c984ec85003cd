use crate::model::collection::{DONE, DUE, PROGRESS, TaskCollection, UPCOMING};
use crate::model::task::FormatConfig;

pub const ARCHIVE: &str = "## Archive";
/// Literal line the board plugin shows under the Done heading
pub const COMPLETE_MARKER: &str = "**Complete**";
pub const ARCHIVE_DIVIDER: &str = "***";

/// Frontmatter key/value that marks a file as a board
pub const BOARD_PROPERTY_NAME: &str = "kanban-plugin";
pub const BOARD_PROPERTY_VALUE: &str = "board";
/// File stem of a newly created board
pub const DEFAULT_BOARD_NAME: &str = "All Tasks";

pub const HEADER: &str = "---\n\nkanban-plugin: board\n\n---";
pub const FOOTER: &str = "%% kanban:settings\n```\n{\"kanban-plugin\":\"board\",\"list-collapse\":[false,false,false,false]}\n```\n%%";

/// Blank lines between board lists
const LIST_SEPARATOR: &str = "\n\n\n\n";
const DIVIDER_LINE: &str = "\n***\n";

/// Body of a board with the four lists and no tasks.
pub fn default_contents() -> String {
    [UPCOMING, DUE, PROGRESS, DONE]
        .iter()
        .map(|list| format!("{}{}", list, LIST_SEPARATOR))
        .collect()
}

/// A board document: the active lists, and an archive below a divider.
///
/// Each collection is parsed on first access and cached, so a board
/// instance does not see later changes to the file; load a new one.
#[derive(Debug)]
pub struct KanbanBoard {
    path: String,
    contents: String,
    config: FormatConfig,
    tasks: Option<TaskCollection>,
    archive: Option<TaskCollection>,
}

impl KanbanBoard {
    /// A board at `path` with the given text, or an empty board when the
    /// text is missing or blank.
    pub fn new(path: impl Into<String>, contents: Option<String>, config: FormatConfig) -> Self {
        let contents = contents
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(default_contents);
        KanbanBoard {
            path: path.into(),
            contents,
            config,
            tasks: None,
            archive: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    fn split_contents(&self) -> (&str, Option<&str>) {
        match self.contents.split_once(DIVIDER_LINE) {
            Some((active, archived)) => (active, Some(archived)),
            None => (&self.contents, None),
        }
    }

    /// The active lists (Upcoming, Due, In progress, Done, and any others).
    pub fn task_collection(&mut self) -> &mut TaskCollection {
        if self.tasks.is_none() {
            let (active, _) = self.split_contents();
            self.tasks = Some(TaskCollection::parse(active, self.config.clone(), true));
        }
        self.tasks.get_or_insert_with(|| TaskCollection::new(FormatConfig::default()))
    }

    /// Tasks below the archive divider.
    pub fn archive_collection(&mut self) -> &mut TaskCollection {
        if self.archive.is_none() {
            let (_, archived) = self.split_contents();
            let mut archive =
                TaskCollection::parse(archived.unwrap_or(""), self.config.clone(), false);
            archive.ensure_list(ARCHIVE);
            self.archive = Some(archive);
        }
        self.archive.get_or_insert_with(|| TaskCollection::new(FormatConfig::default()))
    }

    /// Move every archivable Done task into the archive. Returns how many moved.
    pub fn archive_completed(&mut self) -> usize {
        let stale = self.task_collection().drain_matching(DONE, |t| t.is_archivable());
        let count = stale.len();
        let archive = self.archive_collection();
        for task in stale {
            if !archive.add(task.clone(), Some(ARCHIVE)) {
                archive.replace(task);
            }
        }
        count
    }

    /// The full board document.
    pub fn render(&mut self) -> String {
        let mut out = String::with_capacity(self.contents.len() + 256);
        out.push_str(HEADER);
        out.push_str("\n\n");

        let complete_line = format!("{}\n", COMPLETE_MARKER);
        out.push_str(
            &self
                .task_collection()
                .render_with(LIST_SEPARATOR, |list| {
                    (list == DONE).then_some(complete_line.as_str())
                }),
        );

        let archive = self.archive_collection();
        if !archive.all_tasks().is_empty() {
            out.push_str(DIVIDER_LINE);
            out.push_str(&archive.render("\n"));
        }

        out.push_str("\n\n\n");
        out.push_str(FOOTER);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{CheckState, Task, TaskFormat};
    use chrono::{Days, Local};
    use pretty_assertions::assert_eq;

    fn config() -> FormatConfig {
        FormatConfig::new(TaskFormat::Emoji, "")
    }

    fn completed(name: &str, days_ago: u64) -> Task {
        let date = Local::now().date_naive() - Days::new(days_ago);
        let mut task = Task::new(name, CheckState::Complete, TaskFormat::Emoji);
        task.metadata = format!(" ✅ {}", date.format("%Y-%m-%d"));
        task
    }

    #[test]
    fn empty_board_renders_all_lists() {
        let mut board = KanbanBoard::new("All Tasks.md", None, config());
        let expected = format!(
            "{HEADER}\n\n## Upcoming\n\n\n\n\n\n## Due\n\n\n\n\n\n## In progress\n\n\n\n\n\n## Done\n\n{COMPLETE_MARKER}\n\n\n\n\n\n\n\n{FOOTER}"
        );
        assert_eq!(board.render(), expected);
    }

    #[test]
    fn collection_is_cached() {
        let mut board = KanbanBoard::new("All Tasks.md", None, config());
        board
            .task_collection()
            .add(Task::new("Cached", CheckState::Incomplete, TaskFormat::Emoji), None);
        assert!(board.task_collection().get_task_by_name("Cached").is_some());
    }

    #[test]
    fn complete_marker_precedes_done_tasks() {
        let mut board = KanbanBoard::new("All Tasks.md", None, config());
        board
            .task_collection()
            .add(Task::new("Complete task", CheckState::Complete, TaskFormat::Emoji), None);
        let text = board.render();
        assert!(text.contains(&format!("{DONE}\n\n{COMPLETE_MARKER}\n- [x] Complete task\n\n\n")));
    }

    #[test]
    fn archive_section_only_when_non_empty() {
        let mut board = KanbanBoard::new("All Tasks.md", None, config());
        board.task_collection().add(completed("Recent", 1), None);
        board.task_collection().add(completed("Old", 30), None);

        assert_eq!(board.archive_completed(), 1);
        let text = board.render();
        assert!(text.contains(&format!("{DONE}\n\n{COMPLETE_MARKER}\n- [x] Recent")));
        assert!(text.contains(&format!("\n{ARCHIVE_DIVIDER}\n{ARCHIVE}\n\n- [x] Old ✅")));

        let mut empty = KanbanBoard::new("All Tasks.md", None, config());
        assert!(!empty.render().contains(ARCHIVE_DIVIDER));
    }

    #[test]
    fn empty_done_with_archive_layout() {
        let mut board = KanbanBoard::new("All Tasks.md", None, config());
        board.task_collection().add(completed("Old", 30), None);
        board.archive_completed();
        let text = board.render();
        assert!(text.contains(&format!(
            "{DONE}\n\n{COMPLETE_MARKER}\n\n\n\n\n\n{ARCHIVE_DIVIDER}"
        )));
    }

    #[test]
    fn render_reparses_to_same_document() {
        let mut board = KanbanBoard::new("All Tasks.md", None, config());
        board
            .task_collection()
            .add(Task::new("Upcoming thing", CheckState::Incomplete, TaskFormat::Emoji), None);
        board.task_collection().add(completed("Old", 30), None);
        board.archive_completed();
        let first = board.render();

        let mut reloaded = KanbanBoard::new("All Tasks.md", Some(first.clone()), config());
        assert_eq!(reloaded.render(), first);
        assert!(reloaded.archive_collection().get_task_by_name("Old").is_some());
        assert!(reloaded.task_collection().get_task_by_name("Old").is_none());
    }
}
