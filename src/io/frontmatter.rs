use serde_yaml_ng::{Mapping, Value};

/// Parse the YAML block between a leading `---` line and the next `---`
/// line. Returns `None` when the text has no frontmatter or it is not a
/// YAML mapping.
pub fn parse_frontmatter(content: &str) -> Option<Mapping> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut yaml = String::new();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        yaml.push_str(line);
        yaml.push('\n');
    }
    if !closed || yaml.trim().is_empty() {
        return None;
    }

    match serde_yaml_ng::from_str::<Value>(&yaml) {
        Ok(Value::Mapping(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparsable frontmatter");
            None
        }
    }
}

/// A frontmatter value rendered as a plain string, for scalar values.
pub fn frontmatter_str(frontmatter: &Mapping, key: &str) -> Option<String> {
    match frontmatter.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_header_is_read() {
        let fm = parse_frontmatter("---\n\nkanban-plugin: board\n\n---\n\n## Upcoming\n").unwrap();
        assert_eq!(frontmatter_str(&fm, "kanban-plugin").as_deref(), Some("board"));
    }

    #[test]
    fn no_frontmatter() {
        assert!(parse_frontmatter("# Title\n---\nkey: value\n---\n").is_none());
        assert!(parse_frontmatter("").is_none());
    }

    #[test]
    fn unclosed_or_invalid_frontmatter() {
        assert!(parse_frontmatter("---\nkey: value\n").is_none());
        assert!(parse_frontmatter("---\n: : [\n---\n").is_none());
        assert!(parse_frontmatter("---\n- a list\n---\n").is_none());
    }

    #[test]
    fn scalar_values_as_strings() {
        let fm = parse_frontmatter("---\ncount: 3\ndraft: true\ntags: [a]\n---\n").unwrap();
        assert_eq!(frontmatter_str(&fm, "count").as_deref(), Some("3"));
        assert_eq!(frontmatter_str(&fm, "draft").as_deref(), Some("true"));
        assert_eq!(frontmatter_str(&fm, "tags"), None);
        assert_eq!(frontmatter_str(&fm, "missing"), None);
    }
}
