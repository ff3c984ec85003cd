use std::fmt;

use indexmap::IndexMap;

use crate::model::task::{FormatConfig, Task};
use crate::parse::task_serializer::serialize_task;

pub const UPCOMING: &str = "## Upcoming";
pub const DUE: &str = "## Due";
pub const PROGRESS: &str = "## In progress";
pub const DONE: &str = "## Done";

/// The board lists, in the order they are created when missing
pub const DEFAULT_LISTS: [&str; 4] = [UPCOMING, DUE, PROGRESS, DONE];

/// Tasks grouped under the markdown heading ("list") they appear beneath.
///
/// Lists keep their declaration order. Tasks that appear before any
/// heading live in the list named `""`.
#[derive(Debug, Clone)]
pub struct TaskCollection {
    lists: IndexMap<String, Vec<Task>>,
    config: FormatConfig,
}

impl TaskCollection {
    pub fn new(config: FormatConfig) -> Self {
        TaskCollection {
            lists: IndexMap::new(),
            config,
        }
    }

    /// Parse a whole document. With `ensure_default_lists`, the four board
    /// lists exist afterwards even if the text lacks them.
    pub fn parse(text: &str, config: FormatConfig, ensure_default_lists: bool) -> Self {
        let mut collection = crate::parse::collection_parser::parse_collection(text, config);
        if ensure_default_lists {
            collection.ensure_default_lists();
        }
        collection
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    pub fn has_list(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Create an empty list at the end if `name` is not already present.
    pub fn ensure_list(&mut self, name: &str) {
        if !self.lists.contains_key(name) {
            self.lists.insert(name.to_string(), Vec::new());
        }
    }

    pub fn ensure_default_lists(&mut self) {
        for name in DEFAULT_LISTS {
            self.ensure_list(name);
        }
    }

    pub fn tasks_in(&self, list: &str) -> &[Task] {
        self.lists.get(list).map_or(&[], Vec::as_slice)
    }

    /// Append to a list without the duplicate check, creating the list if
    /// needed. Used while parsing, where text order is kept as written.
    pub(crate) fn push_parsed(&mut self, list: &str, task: Task) {
        self.lists.entry(list.to_string()).or_default().push(task);
    }

    pub(crate) fn last_task_mut(&mut self, list: &str) -> Option<&mut Task> {
        self.lists.get_mut(list)?.last_mut()
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Name of the list holding a task equal to `task`, or `""` if none does.
    pub fn get_list(&self, task: &Task) -> &str {
        self.lists
            .iter()
            .find(|(_, tasks)| tasks.contains(task))
            .map_or("", |(name, _)| name.as_str())
    }

    pub fn get_task(&self, task: &Task) -> Option<&Task> {
        self.get_task_by_name(&task.name)
    }

    pub fn get_task_by_name(&self, name: &str) -> Option<&Task> {
        self.lists.values().flatten().find(|t| t.name == name)
    }

    pub fn get_task_mut(&mut self, task: &Task) -> Option<&mut Task> {
        self.lists.values_mut().flatten().find(|t| t.name == task.name)
    }

    /// Every top-level task, in list order then text order.
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.lists.values().flatten().collect()
    }

    /// Consume the collection, yielding its top-level tasks in order.
    pub fn into_tasks(self) -> Vec<Task> {
        self.lists.into_values().flatten().collect()
    }

    /// Tasks from the named lists, in declaration order. An empty slice or
    /// `[""]` selects every list; unknown names are ignored.
    pub fn get_tasks_from_lists(&self, names: &[&str]) -> Vec<&Task> {
        let all = names.is_empty() || (names.len() == 1 && names[0].is_empty());
        self.lists
            .iter()
            .filter(|(list, _)| all || names.contains(&list.as_str()))
            .flat_map(|(_, tasks)| tasks.iter())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add a task unless an equal one is already in the destination.
    ///
    /// Without an explicit list the destination is Done for complete tasks,
    /// Due for tasks that are due, and Upcoming otherwise. A destination
    /// that does not exist drops the task.
    pub fn add(&mut self, task: Task, list: Option<&str>) -> bool {
        let list = list.unwrap_or_else(|| default_list_for(&task));
        match self.lists.get_mut(list) {
            Some(tasks) if !tasks.contains(&task) => {
                tasks.push(task);
                true
            }
            _ => false,
        }
    }

    /// Remove the equal task from its list and append `task` to `list`.
    pub fn move_task(&mut self, task: Task, list: &str) {
        self.remove(&task);
        if let Some(tasks) = self.lists.get_mut(list) {
            tasks.push(task);
        }
    }

    /// Overwrite the stored equal task in place. No-op when absent.
    pub fn replace(&mut self, task: Task) {
        if let Some(slot) = self.get_task_mut(&task) {
            *slot = task;
        }
    }

    /// Delete the equal task from whichever list holds it.
    pub fn remove(&mut self, task: &Task) -> Option<Task> {
        for tasks in self.lists.values_mut() {
            if let Some(pos) = tasks.iter().position(|t| t == task) {
                return Some(tasks.remove(pos));
            }
        }
        None
    }

    /// Remove and return every task in `list` matching `pred`.
    pub fn drain_matching(&mut self, list: &str, pred: impl Fn(&Task) -> bool) -> Vec<Task> {
        let Some(tasks) = self.lists.get_mut(list) else {
            return Vec::new();
        };
        let (taken, kept): (Vec<Task>, Vec<Task>) =
            std::mem::take(tasks).into_iter().partition(|t| pred(t));
        *tasks = kept;
        taken
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Render each list as `heading\n\n`, its tasks one per line, then
    /// `separator`.
    pub fn render(&self, separator: &str) -> String {
        self.render_with(separator, |_| None)
    }

    /// Like [`render`](Self::render), with optional text inserted between a
    /// list's heading block and its tasks.
    pub fn render_with<'a>(
        &self,
        separator: &str,
        preamble: impl Fn(&str) -> Option<&'a str>,
    ) -> String {
        let mut out = String::new();
        for (list, tasks) in &self.lists {
            out.push_str(list);
            out.push_str("\n\n");
            if let Some(text) = preamble(list) {
                out.push_str(text);
            }
            for task in tasks {
                serialize_task(task, &self.config, &mut out);
            }
            out.push_str(separator);
        }
        out
    }
}

impl fmt::Display for TaskCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("\n"))
    }
}

fn default_list_for(task: &Task) -> &'static str {
    if task.is_complete() {
        DONE
    } else if task.is_due() {
        DUE
    } else {
        UPCOMING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{CheckState, TaskFormat};
    use chrono::{Days, Local};
    use pretty_assertions::assert_eq;

    fn config() -> FormatConfig {
        FormatConfig::new(TaskFormat::Emoji, "")
    }

    fn board() -> TaskCollection {
        TaskCollection::parse("", config(), true)
    }

    fn task(name: &str, state: CheckState) -> Task {
        Task::new(name, state, TaskFormat::Emoji)
    }

    fn due_task(name: &str, days_from_today: i64) -> Task {
        let today = Local::now().date_naive();
        let date = if days_from_today < 0 {
            today - Days::new(days_from_today.unsigned_abs())
        } else {
            today + Days::new(days_from_today as u64)
        };
        let mut t = task(name, CheckState::Incomplete);
        t.set_due_date(date);
        t
    }

    fn names(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn default_lists_are_created_in_order() {
        let c = board();
        assert_eq!(c.list_names().collect::<Vec<_>>(), DEFAULT_LISTS.to_vec());
    }

    #[test]
    fn missing_default_lists_append_after_parsed_ones() {
        let c = TaskCollection::parse("## Due\n\n## Someday\n", config(), true);
        assert_eq!(
            c.list_names().collect::<Vec<_>>(),
            vec![DUE, "## Someday", UPCOMING, PROGRESS, DONE]
        );
    }

    #[test]
    fn add_places_by_state() {
        let mut c = board();
        c.add(task("Finished", CheckState::Complete), None);
        c.add(due_task("Overdue", -1), None);
        c.add(due_task("Later", 3), None);
        c.add(task("Someday", CheckState::Incomplete), None);

        assert_eq!(names(&c.get_tasks_from_lists(&[DONE])), vec!["Finished"]);
        assert_eq!(names(&c.get_tasks_from_lists(&[DUE])), vec!["Overdue"]);
        assert_eq!(names(&c.get_tasks_from_lists(&[UPCOMING])), vec!["Later", "Someday"]);
    }

    #[test]
    fn complete_wins_over_due() {
        let mut c = board();
        let mut t = due_task("Overdue but done", -2);
        t.state = CheckState::Complete;
        c.add(t, None);
        assert_eq!(c.tasks_in(DONE).len(), 1);
    }

    #[test]
    fn add_is_idempotent() {
        let mut c = board();
        assert!(c.add(task("Once", CheckState::Incomplete), None));
        assert!(!c.add(task("Once", CheckState::Complete), Some(UPCOMING)));
        assert_eq!(c.all_tasks().len(), 1);
    }

    #[test]
    fn add_to_unknown_list_drops_task() {
        let mut c = board();
        assert!(!c.add(task("Lost", CheckState::Incomplete), Some("## Nowhere")));
        assert!(c.all_tasks().is_empty());
    }

    #[test]
    fn move_appends_new_task_at_end() {
        let mut c = board();
        c.add(task("A", CheckState::Incomplete), Some(DUE));
        c.add(task("B", CheckState::Incomplete), Some(DUE));
        c.add(task("C", CheckState::Incomplete), Some(UPCOMING));

        c.move_task(task("C", CheckState::Complete), DUE);
        c.move_task(task("A", CheckState::Incomplete), DUE);

        assert_eq!(names(&c.get_tasks_from_lists(&[DUE])), vec!["B", "C", "A"]);
        assert!(c.tasks_in(UPCOMING).is_empty());
        assert!(c.get_task(&task("C", CheckState::Incomplete)).unwrap().is_complete());
    }

    #[test]
    fn replace_overwrites_in_place() {
        let mut c = board();
        c.add(task("A", CheckState::Incomplete), Some(PROGRESS));
        c.add(task("B", CheckState::Incomplete), Some(PROGRESS));
        let mut updated = task("A", CheckState::Incomplete);
        updated.metadata = " ⏫".into();
        c.replace(updated);

        assert_eq!(names(&c.get_tasks_from_lists(&[PROGRESS])), vec!["A", "B"]);
        assert_eq!(c.tasks_in(PROGRESS)[0].metadata, " ⏫");

        c.replace(task("Absent", CheckState::Incomplete));
        assert_eq!(c.all_tasks().len(), 2);
    }

    #[test]
    fn remove_and_get_list() {
        let mut c = board();
        let t = task("A", CheckState::Incomplete);
        c.add(t.clone(), Some(PROGRESS));
        assert_eq!(c.get_list(&t), PROGRESS);
        assert!(c.remove(&t).is_some());
        assert_eq!(c.get_list(&t), "");
        assert!(c.remove(&t).is_none());
    }

    #[test]
    fn tasks_from_lists_selection() {
        let mut c = board();
        c.add(task("Done thing", CheckState::Complete), Some(DONE));
        c.add(task("Up thing", CheckState::Incomplete), Some(UPCOMING));
        c.add(task("Doing", CheckState::Incomplete), Some(PROGRESS));

        let everything = vec!["Up thing", "Doing", "Done thing"];
        assert_eq!(names(&c.get_tasks_from_lists(&[])), everything);
        assert_eq!(names(&c.get_tasks_from_lists(&[""])), everything);
        assert_eq!(
            names(&c.get_tasks_from_lists(&[DONE, "## Missing", UPCOMING])),
            vec!["Up thing", "Done thing"]
        );
    }

    #[test]
    fn drain_matching_keeps_others_in_order() {
        let mut c = board();
        for name in ["a1", "b1", "a2", "b2"] {
            c.add(task(name, CheckState::Complete), Some(DONE));
        }
        let taken = c.drain_matching(DONE, |t| t.name.starts_with('a'));
        assert_eq!(taken.len(), 2);
        assert_eq!(names(&c.get_tasks_from_lists(&[DONE])), vec!["b1", "b2"]);
    }

    #[test]
    fn render_layout() {
        let mut c = TaskCollection::parse("## Today\n", config(), false);
        c.add(task("One", CheckState::Incomplete), Some("## Today"));
        c.add(task("Two", CheckState::Complete), Some("## Today"));
        assert_eq!(c.to_string(), "## Today\n\n- [ ] One\n- [x] Two\n\n");
        assert_eq!(c.render("\n\n\n\n"), "## Today\n\n- [ ] One\n- [x] Two\n\n\n\n\n");
    }
}
