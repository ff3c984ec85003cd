use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::model::task::TaskFormat;

/// Date layout used by both metadata dialects (`YYYY-MM-DD`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Provenance annotation appended to board lines: `%%origin:<path>%%`
pub const ORIGIN_OPEN: &str = "%%origin:";
pub const ORIGIN_CLOSE: &str = "%%";

/// Emoji markers and the field each one encodes. Priority markers carry
/// their level as the value.
const EMOJI_FIELDS: &[(&str, &str)] = &[
    ("📅", "due"),
    ("🛫", "start"),
    ("⏳", "scheduled"),
    ("➕", "created"),
    ("✅", "completion"),
    ("🆔", "id"),
    ("⛔", "dependsOn"),
    ("🔁", "repeat"),
    ("🔺", "priority"),
    ("⏫", "priority"),
    ("🔼", "priority"),
    ("🔽", "priority"),
    ("⏬", "priority"),
];

fn priority_level(marker: &str) -> &'static str {
    match marker {
        "🔺" => "highest",
        "⏫" => "high",
        "🔼" => "medium",
        "🔽" => "low",
        _ => "lowest",
    }
}

impl TaskFormat {
    pub fn due_key(self) -> &'static str {
        "due"
    }

    pub fn completed_key(self) -> &'static str {
        "completion"
    }

    /// Byte offset in `text` where the task name ends and metadata begins.
    ///
    /// A boundary is a metadata token (or origin annotation) at the start of
    /// the text or preceded by whitespace.
    pub fn name_boundary(self, text: &str) -> usize {
        if self.starts_metadata(text) {
            return 0;
        }
        for (idx, ch) in text.char_indices() {
            if !ch.is_whitespace() {
                continue;
            }
            if self.starts_metadata(&text[idx + ch.len_utf8()..]) {
                return idx;
            }
        }
        text.len()
    }

    fn starts_metadata(self, s: &str) -> bool {
        if s.starts_with(ORIGIN_OPEN) {
            return true;
        }
        match self {
            TaskFormat::Emoji => EMOJI_FIELDS.iter().any(|(marker, _)| s.starts_with(marker)),
            TaskFormat::Dataview => dataview_key(s).is_some(),
        }
    }

    /// Parse metadata tokens into a field map, in order of appearance.
    /// Later duplicates of a field overwrite earlier ones.
    pub fn parse_metadata(self, tail: &str) -> IndexMap<String, String> {
        match self {
            TaskFormat::Emoji => parse_emoji_metadata(tail),
            TaskFormat::Dataview => parse_dataview_metadata(tail),
        }
    }

    /// Rewrite `tail` so its due field holds `date`.
    pub fn set_due_date(self, tail: &str, date: NaiveDate) -> String {
        let value = date.format(DATE_FORMAT).to_string();
        match self {
            TaskFormat::Emoji => set_emoji_field(tail, "📅", &value),
            TaskFormat::Dataview => set_dataview_field(tail, "due", &value),
        }
    }
}

// ---------------------------------------------------------------------------
// Emoji dialect
// ---------------------------------------------------------------------------

/// Find every marker in `tail` as (start, end, marker).
fn emoji_markers(tail: &str) -> Vec<(usize, usize, &'static str)> {
    let mut found = Vec::new();
    for (idx, _) in tail.char_indices() {
        let rest = &tail[idx..];
        if let Some((marker, _)) = EMOJI_FIELDS.iter().find(|(m, _)| rest.starts_with(m)) {
            found.push((idx, idx + marker.len(), *marker));
        }
    }
    found
}

fn parse_emoji_metadata(tail: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    let markers = emoji_markers(tail);
    for (i, &(_, end, marker)) in markers.iter().enumerate() {
        let value_end = markers.get(i + 1).map_or(tail.len(), |next| next.0);
        let value = tail[end..value_end].trim();
        let field = EMOJI_FIELDS
            .iter()
            .find(|(m, _)| *m == marker)
            .map_or("", |(_, f)| *f);
        let value = if field == "priority" {
            priority_level(marker).to_string()
        } else {
            value.to_string()
        };
        map.insert(field.to_string(), value);
    }
    map
}

/// Replace the first whitespace-delimited value after `marker`, or append
/// ` marker value` when the marker is absent.
fn set_emoji_field(tail: &str, marker: &str, value: &str) -> String {
    let Some(pos) = tail.find(marker) else {
        return format!("{} {} {}", tail.trim_end(), marker, value);
    };
    let after = pos + marker.len();
    let rest = &tail[after..];
    let value_start = after + (rest.len() - rest.trim_start().len());
    let value_len = tail[value_start..]
        .find(char::is_whitespace)
        .unwrap_or(tail.len() - value_start);
    format!(
        "{} {}{}",
        &tail[..after],
        value,
        &tail[value_start + value_len..]
    )
}

// ---------------------------------------------------------------------------
// Dataview dialect
// ---------------------------------------------------------------------------

/// If `s` opens a `[key::` token, return the key.
fn dataview_key(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('[')?;
    let key_len = inner
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map_or(inner.len(), |(i, _)| i);
    if key_len == 0 || !inner[key_len..].starts_with("::") {
        return None;
    }
    Some(&inner[..key_len])
}

/// Find every complete `[key:: value]` token as (start, end, key, value).
fn dataview_fields(tail: &str) -> Vec<(usize, usize, &str, &str)> {
    let mut found = Vec::new();
    let mut idx = 0;
    while let Some(offset) = tail[idx..].find('[') {
        let start = idx + offset;
        let Some(key) = dataview_key(&tail[start..]) else {
            idx = start + 1;
            continue;
        };
        let value_start = start + 1 + key.len() + 2;
        let Some(close) = tail[value_start..].find(']') else {
            break;
        };
        let end = value_start + close + 1;
        found.push((start, end, key, tail[value_start..end - 1].trim()));
        idx = end;
    }
    found
}

fn parse_dataview_metadata(tail: &str) -> IndexMap<String, String> {
    dataview_fields(tail)
        .into_iter()
        .map(|(_, _, key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn set_dataview_field(tail: &str, key: &str, value: &str) -> String {
    let token = format!("[{}:: {}]", key, value);
    match dataview_fields(tail).into_iter().find(|(_, _, k, _)| *k == key) {
        Some((start, end, _, _)) => format!("{}{}{}", &tail[..start], token, &tail[end..]),
        None => format!("{} {}", tail.trim_end(), token),
    }
}
