use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::snapshot::TaskSnapshot;

/// Directory under the vault root holding tool state
pub const STATE_DIR: &str = ".autotasks";

/// Persisted sync state (written to .autotasks/state.json)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncState {
    /// Board path resolved by the last run
    #[serde(default)]
    pub board_path: Option<String>,
    /// Board tasks as of the last sync, for reverse sync
    #[serde(default)]
    pub snapshot: Vec<TaskSnapshot>,
}

fn state_path(vault_root: &Path) -> PathBuf {
    vault_root.join(STATE_DIR).join("state.json")
}

/// Read .autotasks/state.json from the vault root
pub fn read_sync_state(vault_root: &Path) -> Option<SyncState> {
    let content = fs::read_to_string(state_path(vault_root)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write .autotasks/state.json under the vault root
pub fn write_sync_state(vault_root: &Path, state: &SyncState) -> Result<(), std::io::Error> {
    let path = state_path(vault_root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&path, content)
}
