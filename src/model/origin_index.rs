use std::collections::HashMap;

use indexmap::IndexSet;

use crate::model::task::Task;

/// Which files each task name was found in.
///
/// A name whose last origin is removed is dropped from the index.
#[derive(Debug, Clone, Default)]
pub struct TaskOriginIndex {
    origins: HashMap<String, IndexSet<String>>,
}

impl TaskOriginIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_origin(&mut self, task_name: &str, path: &str) {
        self.origins
            .entry(task_name.to_string())
            .or_default()
            .insert(path.to_string());
    }

    pub fn get_origins(&self, task_name: &str) -> Vec<String> {
        self.origins
            .get(task_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_origins(&self, task_name: &str) -> bool {
        self.origins.contains_key(task_name)
    }

    pub fn remove_origin(&mut self, task_name: &str, path: &str) {
        if let Some(set) = self.origins.get_mut(task_name) {
            set.shift_remove(path);
            if set.is_empty() {
                self.origins.remove(task_name);
            }
        }
    }

    /// Forget `path` for every task.
    pub fn remove_file(&mut self, path: &str) {
        self.origins.retain(|_, set| {
            set.shift_remove(path);
            !set.is_empty()
        });
    }

    /// Point every entry for `old_path` at `new_path` instead.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) {
        for set in self.origins.values_mut() {
            if set.shift_remove(old_path) {
                set.insert(new_path.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        self.origins.clear();
    }

    /// Number of task names with at least one origin
    pub fn size(&self) -> usize {
        self.origins.len()
    }

    /// Replace the index with the origins recorded on `tasks`.
    pub fn build_from_tasks<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        self.clear();
        for task in tasks {
            for origin in &task.origins {
                self.add_origin(&task.name, origin);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{CheckState, TaskFormat};

    #[test]
    fn add_origin_is_idempotent() {
        let mut index = TaskOriginIndex::new();
        index.add_origin("Task 1", "file1.md");
        index.add_origin("Task 1", "file1.md");
        assert_eq!(index.get_origins("Task 1"), vec!["file1.md"]);
        assert_eq!(index.size(), 1);
    }

    #[test]
    fn remove_file_drops_empty_entries() {
        let mut index = TaskOriginIndex::new();
        index.add_origin("Task 1", "file1.md");
        index.add_origin("Task 1", "file2.md");
        index.add_origin("Task 2", "file1.md");

        index.remove_file("file1.md");

        assert_eq!(index.get_origins("Task 1"), vec!["file2.md"]);
        assert!(!index.has_origins("Task 2"));
        assert_eq!(index.size(), 1);
    }

    #[test]
    fn remove_last_origin_removes_task() {
        let mut index = TaskOriginIndex::new();
        index.add_origin("Task 1", "file1.md");
        index.remove_origin("Task 1", "other.md");
        assert!(index.has_origins("Task 1"));
        index.remove_origin("Task 1", "file1.md");
        assert!(!index.has_origins("Task 1"));
        assert_eq!(index.size(), 0);
        assert!(index.get_origins("Task 1").is_empty());
    }

    #[test]
    fn rename_moves_origins() {
        let mut index = TaskOriginIndex::new();
        index.add_origin("Task 1", "old.md");
        index.rename_file("old.md", "new.md");
        assert_eq!(index.get_origins("Task 1"), vec!["new.md"]);
    }

    #[test]
    fn build_replaces_contents() {
        let mut index = TaskOriginIndex::new();
        index.add_origin("Stale", "gone.md");

        let mut a = Task::new("A", CheckState::Incomplete, TaskFormat::Emoji);
        a.add_origin("daily/1.md");
        a.add_origin("daily/2.md");
        let b = Task::new("B", CheckState::Incomplete, TaskFormat::Emoji);
        index.build_from_tasks([&a, &b]);

        assert_eq!(index.size(), 1);
        assert_eq!(index.get_origins("A"), vec!["daily/1.md", "daily/2.md"]);
        assert!(!index.has_origins("Stale"));
        assert!(!index.has_origins("B"));
    }
}
