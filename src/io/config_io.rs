use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::config::Settings;

/// Settings file name at the vault root
pub const CONFIG_FILE: &str = "autotasks.toml";

/// Error type for reading and editing settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("settings are not editable: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("invalid ignore pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Read the vault settings along with the raw toml_edit document, for
/// round-trip-safe editing. A missing file yields defaults and an empty
/// document.
pub fn read_settings(vault_root: &Path) -> Result<(Settings, toml_edit::DocumentMut), ConfigError> {
    let path = vault_root.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let settings: Settings = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((settings, doc))
}

/// Write the settings document back to disk, preserving formatting.
pub fn write_settings(vault_root: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = vault_root.join(CONFIG_FILE);
    fs::write(&path, doc.to_string()).map_err(|source| ConfigError::Write { path, source })
}

fn kanban_table(doc: &mut toml_edit::DocumentMut) -> &mut toml_edit::Item {
    if !doc.contains_key("kanban") {
        doc["kanban"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    &mut doc["kanban"]
}

/// Mark legacy board origins as recovered
pub fn set_origins_migrated(doc: &mut toml_edit::DocumentMut) {
    kanban_table(doc)["origins_migrated"] = toml_edit::value(true);
}

/// Store the board path so later runs skip the frontmatter scan
pub fn set_board_file(doc: &mut toml_edit::DocumentMut, path: &str) {
    kanban_table(doc)["file"] = toml_edit::value(path);
}

/// Starter settings written by `autotasks init`
pub fn default_settings_text() -> &'static str {
    r###"[kanban]
sync = true
ignore_folders = []
ignore_matches = []
debounce_ms = 5000

[tasks]
carry_over_prefix = "[>]"
format = "auto"

[daily]
carry_over = false
header = "## TODOs"

[weekly]
carry_over = false
header = "## TODOs"
"###
}

// ---------------------------------------------------------------------------
// Settings stores
// ---------------------------------------------------------------------------

/// Where the provider reads settings and records settings changes.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    fn settings(&self) -> Settings;

    async fn mark_origins_migrated(&self) -> Result<(), ConfigError>;

    async fn remember_board_file(&self, path: &str) -> Result<(), ConfigError>;
}

/// Settings backed by `autotasks.toml` in a vault directory.
#[derive(Debug)]
pub struct FileSettings {
    root: PathBuf,
    settings: Mutex<Settings>,
}

impl FileSettings {
    pub fn load(vault_root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = vault_root.into();
        let (settings, _) = read_settings(&root)?;
        settings.kanban.compile_ignore_matches()?;
        Ok(FileSettings {
            root,
            settings: Mutex::new(settings),
        })
    }

    fn edit(
        &self,
        apply: impl FnOnce(&mut toml_edit::DocumentMut, &mut Settings),
    ) -> Result<(), ConfigError> {
        let (_, mut doc) = read_settings(&self.root)?;
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut doc, &mut settings);
        write_settings(&self.root, &doc)
    }
}

#[async_trait]
impl SettingsStore for FileSettings {
    fn settings(&self) -> Settings {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn mark_origins_migrated(&self) -> Result<(), ConfigError> {
        self.edit(|doc, settings| {
            set_origins_migrated(doc);
            settings.kanban.origins_migrated = true;
        })
    }

    async fn remember_board_file(&self, path: &str) -> Result<(), ConfigError> {
        self.edit(|doc, settings| {
            set_board_file(doc, path);
            settings.kanban.file = path.to_string();
        })
    }
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: Mutex<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        MemorySettings {
            settings: Mutex::new(settings),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Settings)) {
        apply(&mut self.settings.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    fn settings(&self) -> Settings {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn mark_origins_migrated(&self) -> Result<(), ConfigError> {
        self.update(|s| s.kanban.origins_migrated = true);
        Ok(())
    }

    async fn remember_board_file(&self, path: &str) -> Result<(), ConfigError> {
        self.update(|s| s.kanban.file = path.to_string());
        Ok(())
    }
}
