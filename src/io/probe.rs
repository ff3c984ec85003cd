use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::parse::factory::FormatProbe;

/// Location of the tasks plugin settings, relative to the vault root
pub const TASKS_PLUGIN_DATA: &str = ".obsidian/plugins/obsidian-tasks-plugin/data.json";

#[derive(Debug, Deserialize)]
struct TasksPluginData {
    #[serde(rename = "taskFormat", default)]
    task_format: String,
}

/// Reads the tasks plugin's settings to learn the vault's dialect.
///
/// A missing or unreadable settings file means the emoji dialect.
#[derive(Debug, Clone)]
pub struct TasksPluginProbe {
    data_path: PathBuf,
}

impl TasksPluginProbe {
    pub fn new(vault_root: &Path) -> Self {
        TasksPluginProbe {
            data_path: vault_root.join(TASKS_PLUGIN_DATA),
        }
    }
}

#[async_trait]
impl FormatProbe for TasksPluginProbe {
    async fn is_structured_field_format(&self) -> bool {
        let text = match tokio::fs::read_to_string(&self.data_path).await {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %self.data_path.display(), error = %e, "no tasks plugin settings");
                return false;
            }
        };
        match serde_json::from_str::<TasksPluginData>(&text) {
            Ok(data) => data.task_format == "dataview",
            Err(e) => {
                debug!(error = %e, "unreadable tasks plugin settings");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_data(root: &Path, text: &str) {
        let path = root.join(TASKS_PLUGIN_DATA);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[tokio::test]
    async fn dataview_setting() {
        let tmp = TempDir::new().unwrap();
        write_data(tmp.path(), r#"{"taskFormat": "dataview", "globalFilter": ""}"#);
        assert!(TasksPluginProbe::new(tmp.path()).is_structured_field_format().await);
    }

    #[tokio::test]
    async fn emoji_setting() {
        let tmp = TempDir::new().unwrap();
        write_data(tmp.path(), r#"{"taskFormat": "tasksPluginEmoji"}"#);
        assert!(!TasksPluginProbe::new(tmp.path()).is_structured_field_format().await);
    }

    #[tokio::test]
    async fn missing_or_broken_settings() {
        let tmp = TempDir::new().unwrap();
        let probe = TasksPluginProbe::new(tmp.path());
        assert!(!probe.is_structured_field_format().await);
        write_data(tmp.path(), "{");
        assert!(!probe.is_structured_field_format().await);
    }
}
