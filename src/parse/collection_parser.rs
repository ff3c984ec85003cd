use tracing::debug;

use crate::model::collection::TaskCollection;
use crate::model::task::{FormatConfig, Task};
use crate::parse::task_parser::{DEFAULT_SPACE_UNIT, parse_task_line, split_checkbox};

/// A markdown ATX heading: one to six `#` then a space or end of line.
pub fn is_heading(line: &str) -> bool {
    let hashes = line.len() - line.trim_start_matches('#').len();
    (1..=6).contains(&hashes) && matches!(line[hashes..].chars().next(), None | Some(' '))
}

/// Width of one indent level in a space-indented document: the first
/// space-only indent found on a checkbox line.
pub fn detect_space_unit(text: &str) -> usize {
    text.lines()
        .filter_map(split_checkbox)
        .map(|(indent, _, _)| indent)
        .find(|indent| !indent.is_empty() && !indent.contains('\t'))
        .map_or(DEFAULT_SPACE_UNIT, str::len)
}

/// Parse a document into lists of task trees.
///
/// Headings open lists. An indented task becomes a child of the nearest
/// preceding task at a shallower level; with no such task in the current
/// list it stays top-level. Tasks with an empty name are dropped together
/// with their sub-tasks.
pub fn parse_collection(text: &str, config: FormatConfig) -> TaskCollection {
    let space_unit = detect_space_unit(text);
    let mut collection = TaskCollection::new(config);
    let mut current = String::new();
    // Levels of the most recent task at each depth, outermost first
    let mut chain: Vec<usize> = Vec::new();
    let mut skip_deeper_than: Option<usize> = None;

    for line in text.lines() {
        if is_heading(line) {
            current = line.to_string();
            collection.ensure_list(&current);
            chain.clear();
            skip_deeper_than = None;
            continue;
        }

        let Some(task) = parse_task_line(line, collection.config(), space_unit) else {
            continue;
        };
        let level = task.indent_level;

        if let Some(skip) = skip_deeper_than {
            if level > skip {
                continue;
            }
            skip_deeper_than = None;
        }
        if task.name.is_empty() {
            debug!(line, "dropping task line with no name");
            skip_deeper_than = Some(level);
            continue;
        }

        while chain.last().is_some_and(|l| *l >= level) {
            chain.pop();
        }
        if chain.is_empty() {
            collection.push_parsed(&current, task);
        } else if let Err(task) = attach(&mut collection, &current, chain.len(), task) {
            chain.clear();
            collection.push_parsed(&current, task);
        }
        chain.push(level);
    }

    collection
}

/// Push `task` as the last child of the task at `depth` along the list's
/// trailing path (depth 1 = the last top-level task).
fn attach(
    collection: &mut TaskCollection,
    list: &str,
    depth: usize,
    task: Task,
) -> Result<(), Task> {
    let Some(mut parent) = collection.last_task_mut(list) else {
        return Err(task);
    };
    for _ in 1..depth {
        match parent.children.last_mut() {
            Some(child) => parent = child,
            None => return Err(task),
        }
    }
    parent.children.push(task);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskFormat;
    use pretty_assertions::assert_eq;

    fn config() -> FormatConfig {
        FormatConfig::new(TaskFormat::Emoji, "")
    }

    #[test]
    fn headings() {
        assert!(is_heading("# Title"));
        assert!(is_heading("###### Six"));
        assert!(is_heading("##"));
        assert!(!is_heading("####### Seven"));
        assert!(!is_heading("#tag at start"));
        assert!(!is_heading(" ## indented"));
    }

    #[test]
    fn tasks_grouped_by_heading() {
        let c = parse_collection(
            "- [ ] Loose\n# Work\n- [ ] Ship it\nSome prose\n- [x] Review\n## Home\n- [ ] Dishes\n",
            config(),
        );
        assert_eq!(c.list_names().collect::<Vec<_>>(), vec!["", "# Work", "## Home"]);
        assert_eq!(c.tasks_in("# Work").len(), 2);
        assert_eq!(c.tasks_in("## Home")[0].name, "Dishes");
        assert_eq!(c.tasks_in("")[0].name, "Loose");
    }

    #[test]
    fn tab_children_attach_in_order() {
        let c = parse_collection("- [ ] Parent\n\t- [ ] Child1\n\t- [ ] Child2\n", config());
        let top = c.all_tasks();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Parent");
        let children: Vec<_> = top[0].children.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(children, vec!["Child1", "Child2"]);
    }

    #[test]
    fn missing_levels_use_nearest_parent() {
        let c = parse_collection(
            "- [ ] A\n\t- [ ] B\n\t\t\t- [ ] D\n\t\t- [ ] C\n- [ ] E\n",
            config(),
        );
        let top = c.all_tasks();
        assert_eq!(top.len(), 2);
        let b = &top[0].children[0];
        let under_b: Vec<_> = b.children.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(under_b, vec!["D", "C"]);
    }

    #[test]
    fn orphan_becomes_top_level() {
        let c = parse_collection("## Today\n\t- [ ] Orphan\n\t\t- [ ] Its child\n", config());
        let top = c.tasks_in("## Today");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Orphan");
        assert_eq!(top[0].children[0].name, "Its child");
    }

    #[test]
    fn heading_resets_nesting() {
        let c = parse_collection("## A\n- [ ] Parent\n## B\n\t- [ ] Indented\n", config());
        assert!(c.tasks_in("## A")[0].children.is_empty());
        assert_eq!(c.tasks_in("## B")[0].name, "Indented");
    }

    #[test]
    fn space_unit_comes_from_first_indent() {
        let text = "- [ ] A\n    - [ ] B\n        - [ ] C\n";
        assert_eq!(detect_space_unit(text), 4);
        let c = parse_collection(text, config());
        let a = c.all_tasks()[0];
        assert_eq!(a.children[0].indent_level, 1);
        assert_eq!(a.children[0].children[0].indent_level, 2);
    }

    #[test]
    fn default_space_unit() {
        assert_eq!(detect_space_unit("- [ ] Flat\n"), 2);
        assert_eq!(detect_space_unit("- [ ] A\n\t- [ ] B\n"), 2);
    }

    #[test]
    fn nameless_tasks_drop_with_subtree() {
        let c = parse_collection(
            "- [ ] 📅 2024-01-01\n\t- [ ] Under nameless\n- [ ] Kept\n",
            config(),
        );
        let names: Vec<_> = c.all_tasks().iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["Kept"]);
    }
}
