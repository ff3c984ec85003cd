use indexmap::IndexSet;

use crate::model::task::{CheckState, FormatConfig, Task};
use crate::parse::dialect::{ORIGIN_CLOSE, ORIGIN_OPEN};

/// Width of one indent level for space-indented lines when the document
/// gives no better hint.
pub const DEFAULT_SPACE_UNIT: usize = 2;

/// The pieces of a checkbox line: leading whitespace, state, and the text
/// after `- [c] `.
pub fn split_checkbox(line: &str) -> Option<(&str, CheckState, &str)> {
    let content = line.trim_start_matches([' ', '\t']);
    let indent = &line[..line.len() - content.len()];

    let after_open = content.strip_prefix("- [")?;
    let mut chars = after_open.chars();
    let state = CheckState::from_checkbox_char(chars.next()?)?;
    let after_close = chars.as_str().strip_prefix(']')?;

    let rest = if after_close.is_empty() {
        after_close
    } else {
        after_close.strip_prefix(' ')?
    };
    Some((indent, state, rest))
}

/// True when the line is a checkbox task line at any indent.
pub fn is_task_line(line: &str) -> bool {
    split_checkbox(line).is_some()
}

/// Nesting depth of a leading-whitespace run.
///
/// Tabs count one level each. Space-only indents are divided by
/// `space_unit`, and any indent at all is at least level 1.
pub fn indent_level(indent: &str, space_unit: usize) -> usize {
    if indent.is_empty() {
        return 0;
    }
    let tabs = indent.chars().filter(|c| *c == '\t').count();
    if tabs > 0 {
        return tabs;
    }
    (indent.len() / space_unit.max(1)).max(1)
}

/// Parse a single checkbox line into a task with no children.
pub fn parse_task_line(line: &str, config: &FormatConfig, space_unit: usize) -> Option<Task> {
    let (indent, state, rest) = split_checkbox(line)?;

    let (carried_over, rest) = strip_carry_over(rest, &config.carry_over_prefix);

    let boundary = config.format.name_boundary(rest);
    let raw_name = &rest[..boundary];
    let name = raw_name.trim_end();
    // Trailing whitespace of the name belongs to the tail so output matches input.
    let tail = &rest[name.len()..];
    let (metadata, origins) = split_origins(tail);

    Some(Task {
        name: name.to_string(),
        state,
        format: config.format,
        carried_over,
        indent: indent.to_string(),
        indent_level: indent_level(indent, space_unit),
        metadata,
        origins,
        children: Vec::new(),
    })
}

fn strip_carry_over<'a>(rest: &'a str, prefix: &str) -> (bool, &'a str) {
    if prefix.is_empty() {
        return (false, rest);
    }
    match rest.strip_prefix(prefix) {
        Some(after) if after.starts_with(' ') => (true, &after[1..]),
        Some("") => (true, ""),
        _ => (false, rest),
    }
}

/// Pull `%%origin:<path>%%` annotations out of a metadata tail.
/// Each annotation takes its single leading space with it.
fn split_origins(tail: &str) -> (String, IndexSet<String>) {
    let mut origins = IndexSet::new();
    if !tail.contains(ORIGIN_OPEN) {
        return (tail.to_string(), origins);
    }

    let mut metadata = String::with_capacity(tail.len());
    let mut rest = tail;
    while let Some(start) = rest.find(ORIGIN_OPEN) {
        let path_start = start + ORIGIN_OPEN.len();
        let Some(close) = rest[path_start..].find(ORIGIN_CLOSE) else {
            break;
        };
        let before = &rest[..start];
        metadata.push_str(before.strip_suffix(' ').unwrap_or(before));
        let path = &rest[path_start..path_start + close];
        if !path.is_empty() {
            origins.insert(path.to_string());
        }
        rest = &rest[path_start + close + ORIGIN_CLOSE.len()..];
    }
    metadata.push_str(rest);
    (metadata, origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskFormat;

    fn emoji() -> FormatConfig {
        FormatConfig::new(TaskFormat::Emoji, "[>]")
    }

    fn dataview() -> FormatConfig {
        FormatConfig::new(TaskFormat::Dataview, "[>]")
    }

    #[test]
    fn parse_minimal_task() {
        let task = parse_task_line("- [ ] Water the plants", &emoji(), 2).unwrap();
        assert_eq!(task.name, "Water the plants");
        assert_eq!(task.state, CheckState::Incomplete);
        assert_eq!(task.metadata, "");
        assert_eq!(task.indent_level, 0);
        assert!(!task.carried_over);
    }

    #[test]
    fn parse_states() {
        for (ch, expected) in [
            (' ', CheckState::Incomplete),
            ('x', CheckState::Complete),
            ('n', CheckState::NotNeeded),
        ] {
            let task = parse_task_line(&format!("- [{}] Test task", ch), &emoji(), 2).unwrap();
            assert_eq!(task.state, expected);
        }
    }

    #[test]
    fn rejects_non_task_lines() {
        for line in [
            "- [>] Odd mark",
            "* [ ] Star bullet",
            "- Plain bullet",
            "## Heading",
            "- [ ]x",
        ] {
            assert!(parse_task_line(line, &emoji(), 2).is_none(), "{}", line);
        }
    }

    #[test]
    fn emoji_name_and_metadata() {
        let task = parse_task_line("- [ ] Pay rent ⏫ 📅 2024-02-01", &emoji(), 2).unwrap();
        assert_eq!(task.name, "Pay rent");
        assert_eq!(task.metadata, " ⏫ 📅 2024-02-01");
    }

    #[test]
    fn dataview_name_and_metadata() {
        let task =
            parse_task_line("- [x] Pay rent [due:: 2024-02-01]  [completion:: 2024-02-02]", &dataview(), 2)
                .unwrap();
        assert_eq!(task.name, "Pay rent");
        assert_eq!(task.metadata, " [due:: 2024-02-01]  [completion:: 2024-02-02]");
        assert!(task.is_complete());
    }

    #[test]
    fn emoji_markers_do_not_end_dataview_names() {
        let task = parse_task_line("- [ ] Pay rent 📅 2024-02-01", &dataview(), 2).unwrap();
        assert_eq!(task.name, "Pay rent 📅 2024-02-01");
    }

    #[test]
    fn carry_over_prefix_is_stripped() {
        let task = parse_task_line("- [ ] [>] Follow up with Alex", &emoji(), 2).unwrap();
        assert!(task.carried_over);
        assert_eq!(task.name, "Follow up with Alex");
    }

    #[test]
    fn prefix_without_space_is_part_of_name() {
        let task = parse_task_line("- [ ] [>]Follow up", &emoji(), 2).unwrap();
        assert!(!task.carried_over);
        assert_eq!(task.name, "[>]Follow up");
    }

    #[test]
    fn origins_are_split_from_metadata() {
        let task = parse_task_line(
            "- [ ] Call Sam 📅 2024-02-01 %%origin:daily/a.md%% %%origin:notes/b.md%%",
            &emoji(),
            2,
        )
        .unwrap();
        assert_eq!(task.name, "Call Sam");
        assert_eq!(task.metadata, " 📅 2024-02-01");
        let origins: Vec<_> = task.origins.iter().map(String::as_str).collect();
        assert_eq!(origins, vec!["daily/a.md", "notes/b.md"]);
    }

    #[test]
    fn trailing_whitespace_stays_in_tail() {
        let task = parse_task_line("- [ ] Stretch  ", &emoji(), 2).unwrap();
        assert_eq!(task.name, "Stretch");
        assert_eq!(task.metadata, "  ");
    }

    #[test]
    fn metadata_only_line_has_empty_name() {
        let task = parse_task_line("- [ ] 📅 2024-02-01", &emoji(), 2).unwrap();
        assert_eq!(task.name, "");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent_level("", 2), 0);
        assert_eq!(indent_level("\t", 2), 1);
        assert_eq!(indent_level("\t\t", 2), 2);
        assert_eq!(indent_level("  ", 2), 1);
        assert_eq!(indent_level("    ", 2), 2);
        assert_eq!(indent_level("    ", 4), 1);
        assert_eq!(indent_level(" ", 4), 1);
        assert_eq!(indent_level("   ", 2), 1);
    }

    #[test]
    fn indented_task_keeps_raw_indent() {
        let task = parse_task_line("\t\t- [ ] Deep", &emoji(), 2).unwrap();
        assert_eq!(task.indent, "\t\t");
        assert_eq!(task.indent_level, 2);
    }
}
