use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::model::collection::TaskCollection;
use crate::model::task::{FormatConfig, Task, TaskFormat};
use crate::parse::task_parser::{DEFAULT_SPACE_UNIT, parse_task_line};

/// Answers whether the vault writes task metadata as `[key:: value]` fields.
#[async_trait]
pub trait FormatProbe: Send + Sync {
    async fn is_structured_field_format(&self) -> bool;
}

/// A probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub TaskFormat);

#[async_trait]
impl FormatProbe for FixedProbe {
    async fn is_structured_field_format(&self) -> bool {
        self.0 == TaskFormat::Dataview
    }
}

/// Builds tasks and collections in the vault's dialect.
///
/// The dialect is probed once and cached. Until [`resolve`](Self::resolve)
/// has completed, the emoji dialect is used.
pub struct TaskFactory {
    probe: Arc<dyn FormatProbe>,
    format: OnceCell<TaskFormat>,
    carry_over_prefix: String,
}

impl TaskFactory {
    pub fn new(probe: Arc<dyn FormatProbe>, carry_over_prefix: impl Into<String>) -> Self {
        TaskFactory {
            probe,
            format: OnceCell::new(),
            carry_over_prefix: carry_over_prefix.into(),
        }
    }

    /// Probe the dialect if not already known and return it.
    pub async fn resolve(&self) -> TaskFormat {
        *self
            .format
            .get_or_init(|| async {
                let format = if self.probe.is_structured_field_format().await {
                    TaskFormat::Dataview
                } else {
                    TaskFormat::Emoji
                };
                debug!(?format, "resolved task format");
                format
            })
            .await
    }

    pub fn current_format(&self) -> TaskFormat {
        self.format.get().copied().unwrap_or_default()
    }

    pub fn config(&self) -> FormatConfig {
        FormatConfig::new(self.current_format(), self.carry_over_prefix.clone())
    }

    pub fn new_task(&self, line: &str) -> Option<Task> {
        parse_task_line(line, &self.config(), DEFAULT_SPACE_UNIT)
    }

    pub fn new_collection(&self, text: &str, ensure_default_lists: bool) -> TaskCollection {
        TaskCollection::parse(text, self.config(), ensure_default_lists)
    }
}
