use chrono::{Days, Local, NaiveDate};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Completed tasks older than this many days leave the Done list for the archive.
pub const ARCHIVE_AFTER_DAYS: u64 = 14;

/// Task checkbox state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Incomplete,
    Complete,
    NotNeeded,
}

impl CheckState {
    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            CheckState::Incomplete => ' ',
            CheckState::Complete => 'x',
            CheckState::NotNeeded => 'n',
        }
    }

    /// Parse a checkbox character into a state
    pub fn from_checkbox_char(c: char) -> Option<CheckState> {
        match c {
            ' ' => Some(CheckState::Incomplete),
            'x' => Some(CheckState::Complete),
            'n' => Some(CheckState::NotNeeded),
            _ => None,
        }
    }
}

/// Which inline metadata encoding a task line uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFormat {
    /// Single marker symbols: `📅 2024-01-31`, `✅ 2024-02-01`
    #[default]
    Emoji,
    /// Bracketed fields: `[due:: 2024-01-31]`, `[completion:: 2024-02-01]`
    Dataview,
}

/// Parsing options shared by every task in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatConfig {
    pub format: TaskFormat,
    /// Text placed right after the checkbox on tasks copied from a previous period
    pub carry_over_prefix: String,
}

impl FormatConfig {
    pub fn new(format: TaskFormat, carry_over_prefix: impl Into<String>) -> Self {
        FormatConfig {
            format,
            carry_over_prefix: carry_over_prefix.into(),
        }
    }
}

/// A single checkbox item and its sub-tasks.
///
/// Two tasks are the same task when their names match exactly; every other
/// field is state that sync carries along.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub state: CheckState,
    pub format: TaskFormat,
    /// Whether the carry-over prefix preceded the name
    pub carried_over: bool,
    /// Raw leading whitespace, reproduced verbatim on output
    pub indent: String,
    /// Nesting depth (0 = top-level)
    pub indent_level: usize,
    /// Everything after the name except origin annotations, byte-for-byte
    pub metadata: String,
    /// Files this task's line was found in
    pub origins: IndexSet<String>,
    pub children: Vec<Task>,
}

impl Task {
    /// Create an unindented task with no metadata
    pub fn new(name: impl Into<String>, state: CheckState, format: TaskFormat) -> Self {
        Task {
            name: name.into(),
            state,
            format,
            carried_over: false,
            indent: String::new(),
            indent_level: 0,
            metadata: String::new(),
            origins: IndexSet::new(),
            children: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == CheckState::Complete
    }

    pub fn is_not_needed(&self) -> bool {
        self.state == CheckState::NotNeeded
    }

    /// Parse the metadata tail into key/value pairs, in order of appearance.
    pub fn get_metadata(&self) -> IndexMap<String, String> {
        self.format.parse_metadata(&self.metadata)
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.date_field(self.format.due_key())
    }

    pub fn completed_date(&self) -> Option<NaiveDate> {
        self.date_field(self.format.completed_key())
    }

    fn date_field(&self, key: &str) -> Option<NaiveDate> {
        let meta = self.get_metadata();
        let value = meta.get(key)?;
        NaiveDate::parse_from_str(value, crate::parse::dialect::DATE_FORMAT).ok()
    }

    /// Due today or earlier, judged against the local date at call time.
    pub fn is_due(&self) -> bool {
        self.is_due_on(Local::now().date_naive())
    }

    pub fn is_due_on(&self, today: NaiveDate) -> bool {
        match (self.due_date(), today.checked_add_days(Days::new(1))) {
            (Some(due), Some(tomorrow)) => due < tomorrow,
            _ => false,
        }
    }

    /// Complete, with a completed date more than two weeks old.
    pub fn is_archivable(&self) -> bool {
        self.is_archivable_on(Local::now().date_naive())
    }

    pub fn is_archivable_on(&self, today: NaiveDate) -> bool {
        if !self.is_complete() {
            return false;
        }
        match (
            self.completed_date(),
            today.checked_sub_days(Days::new(ARCHIVE_AFTER_DAYS)),
        ) {
            (Some(done), Some(cutoff)) => done <= cutoff,
            _ => false,
        }
    }

    /// Replace the due date in the metadata, appending it if absent
    pub fn set_due_date(&mut self, date: NaiveDate) {
        self.metadata = self.format.set_due_date(&self.metadata, date);
    }

    pub fn mark_carried_over(&mut self) -> &mut Self {
        self.carried_over = true;
        self
    }

    /// Drop completed sub-tasks at every depth.
    pub fn filter_incomplete_children(&mut self) {
        self.children.retain(|child| !child.is_complete());
        for child in &mut self.children {
            child.filter_incomplete_children();
        }
    }

    /// Re-indent this task to `level`, shifting sub-tasks by the same amount.
    pub fn set_indent_level(&mut self, level: usize) {
        let delta = level as isize - self.indent_level as isize;
        if delta == 0 {
            return;
        }
        let unit = self.indent_unit();
        self.shift_indent(&unit, delta);
    }

    fn shift_indent(&mut self, unit: &str, delta: isize) {
        let level = (self.indent_level as isize + delta).max(0) as usize;
        self.indent_level = level;
        self.indent = unit.repeat(level);
        for child in &mut self.children {
            child.shift_indent(unit, delta);
        }
    }

    /// One level of this task's indentation: a tab, or the run of spaces
    /// that makes up a single level. Unindented tasks borrow their first
    /// child's unit, falling back to a tab.
    fn indent_unit(&self) -> String {
        if self.indent.contains('\t') {
            return "\t".to_string();
        }
        if self.indent_level > 0 && !self.indent.is_empty() {
            let width = (self.indent.len() / self.indent_level).max(1);
            return " ".repeat(width);
        }
        match self.children.first() {
            Some(child) if child.indent_level > 0 => child.indent_unit(),
            _ => "\t".to_string(),
        }
    }

    pub fn add_origin(&mut self, path: impl Into<String>) {
        self.origins.insert(path.into());
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Task {}
