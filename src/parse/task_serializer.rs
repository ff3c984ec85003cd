use crate::model::task::{FormatConfig, Task};
use crate::parse::dialect::{ORIGIN_CLOSE, ORIGIN_OPEN};

/// Serialize a task's own line (no children, no trailing newline).
pub fn serialize_task_line(task: &Task, config: &FormatConfig) -> String {
    let mut out =
        String::with_capacity(task.indent.len() + task.name.len() + task.metadata.len() + 8);
    out.push_str(&task.indent);
    out.push_str("- [");
    out.push(task.state.checkbox_char());
    out.push_str("] ");
    if task.carried_over && !config.carry_over_prefix.is_empty() {
        out.push_str(&config.carry_over_prefix);
        out.push(' ');
    }
    out.push_str(&task.name);
    out.push_str(&task.metadata);
    for origin in &task.origins {
        out.push(' ');
        out.push_str(ORIGIN_OPEN);
        out.push_str(origin);
        out.push_str(ORIGIN_CLOSE);
    }
    out
}

/// Serialize a task and all of its sub-tasks, one line each, every line
/// followed by a newline.
pub fn serialize_task(task: &Task, config: &FormatConfig, out: &mut String) {
    out.push_str(&serialize_task_line(task, config));
    out.push('\n');
    for child in &task.children {
        serialize_task(child, config, out);
    }
}
