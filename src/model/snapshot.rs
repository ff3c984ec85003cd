use serde::{Deserialize, Serialize};

use crate::model::collection::TaskCollection;
use crate::model::task::Task;

/// What reverse sync remembers about a board task between passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub name: String,
    pub complete: bool,
    #[serde(default)]
    pub origins: Vec<String>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        TaskSnapshot {
            name: task.name.clone(),
            complete: task.is_complete(),
            origins: task.origins.iter().cloned().collect(),
        }
    }
}

/// Snapshot every top-level task of a collection.
pub fn snapshot_collection(collection: &TaskCollection) -> Vec<TaskSnapshot> {
    collection.all_tasks().into_iter().map(TaskSnapshot::from).collect()
}
