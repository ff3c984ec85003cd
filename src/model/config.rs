use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::task::TaskFormat;

/// Configuration from autotasks.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub kanban: KanbanConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub daily: PeriodicConfig,
    #[serde(default)]
    pub weekly: PeriodicConfig,
}

impl Settings {
    pub fn periodic(&self, periodicity: Periodicity) -> &PeriodicConfig {
        match periodicity {
            Periodicity::Daily => &self.daily,
            Periodicity::Weekly => &self.weekly,
        }
    }
}

/// Kinds of periodic note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Daily,
    Weekly,
}

impl Periodicity {
    /// chrono format of note file stems when none is configured
    pub fn default_format(self) -> &'static str {
        match self {
            Periodicity::Daily => "%Y-%m-%d",
            Periodicity::Weekly => "%G-W%V",
        }
    }
}

impl std::fmt::Display for Periodicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Periodicity::Daily => write!(f, "daily"),
            Periodicity::Weekly => write!(f, "weekly"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanConfig {
    /// Keep the board in sync with the vault
    #[serde(default = "default_true")]
    pub sync: bool,
    /// Board path relative to the vault root; empty means look it up by frontmatter
    #[serde(default)]
    pub file: String,
    /// Folders (vault-relative) whose files never feed the board
    #[serde(default)]
    pub ignore_folders: Vec<String>,
    /// Regexes; tasks whose name matches any of them are not synced
    #[serde(default)]
    pub ignore_matches: Vec<String>,
    /// Set once legacy board tasks have had their origins recovered
    #[serde(default)]
    pub origins_migrated: bool,
    /// Quiet period before a changed file is synced
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        KanbanConfig {
            sync: true,
            file: String::new(),
            ignore_folders: Vec::new(),
            ignore_matches: Vec::new(),
            origins_migrated: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl KanbanConfig {
    /// Whether `path` sits under one of the ignored folders.
    pub fn is_ignored_path(&self, path: &str) -> bool {
        self.ignore_folders.iter().any(|folder| {
            let folder = folder.trim_end_matches('/');
            !folder.is_empty() && path.starts_with(&format!("{}/", folder))
        })
    }

    pub fn compile_ignore_matches(&self) -> Result<Vec<Regex>, regex::Error> {
        self.ignore_matches.iter().map(|p| Regex::new(p)).collect()
    }
}

/// Which dialect task metadata is written in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSetting {
    /// Ask the tasks plugin config in the vault
    #[default]
    Auto,
    Emoji,
    Dataview,
}

impl FormatSetting {
    pub fn fixed(self) -> Option<TaskFormat> {
        match self {
            FormatSetting::Auto => None,
            FormatSetting::Emoji => Some(TaskFormat::Emoji),
            FormatSetting::Dataview => Some(TaskFormat::Dataview),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_carry_over_prefix")]
    pub carry_over_prefix: String,
    #[serde(default)]
    pub format: FormatSetting,
}

impl Default for TasksConfig {
    fn default() -> Self {
        TasksConfig {
            carry_over_prefix: default_carry_over_prefix(),
            format: FormatSetting::Auto,
        }
    }
}

/// Settings for one kind of periodic note (daily or weekly)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicConfig {
    /// Copy incomplete tasks from the previous note into a new one
    #[serde(default)]
    pub carry_over: bool,
    /// Give carried tasks a due date of today
    #[serde(default)]
    pub set_due_date: bool,
    /// Also pull board tasks due before the next period starts
    #[serde(default)]
    pub add_due: bool,
    /// Heading placed above the carried tasks
    #[serde(default = "default_header")]
    pub header: String,
    /// Headings to collect tasks from; empty means all
    #[serde(default)]
    pub search_headers: Vec<String>,
    /// Folder holding the notes, relative to the vault root
    #[serde(default)]
    pub folder: String,
    /// chrono format of note file stems; empty means the periodicity's default
    #[serde(default)]
    pub format: String,
}

impl PeriodicConfig {
    pub fn note_format(&self, periodicity: Periodicity) -> &str {
        if self.format.is_empty() {
            periodicity.default_format()
        } else {
            &self.format
        }
    }
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        PeriodicConfig {
            carry_over: false,
            set_due_date: false,
            add_due: false,
            header: default_header(),
            search_headers: Vec::new(),
            folder: String::new(),
            format: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    5000
}

fn default_carry_over_prefix() -> String {
    "[>]".into()
}

fn default_header() -> String {
    "## TODOs".into()
}
