use std::path::{Component, Path};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::io::fs_vault::FsVault;
use crate::io::vault::VaultFile;
use crate::ops::watcher::Watcher;

/// A change to a markdown file in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultChange {
    Created(VaultFile),
    Modified(VaultFile),
    Removed(VaultFile),
    Renamed { from: String, to: VaultFile },
}

/// Feeds filesystem events under a vault root into a [`Watcher`].
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    pump: JoinHandle<()>,
}

impl VaultWatcher {
    /// Start watching `vault`. Changes to `board_path` are reported as
    /// board edits; everything else as file changes.
    pub fn start(
        vault: &FsVault,
        board_path: String,
        watcher: Arc<Watcher>,
    ) -> Result<Self, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut fs_watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => debug!(error = %e, "watch error"),
            },
            Config::default(),
        )?;
        fs_watcher.watch(vault.root(), RecursiveMode::Recursive)?;

        let vault = vault.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for change in classify(&vault, &event) {
                    dispatch(&watcher, &board_path, change);
                }
            }
        });

        Ok(VaultWatcher {
            _watcher: fs_watcher,
            pump,
        })
    }
}

impl Drop for VaultWatcher {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

fn dispatch(watcher: &Watcher, board_path: &str, change: VaultChange) {
    trace!(?change, "vault change");
    match change {
        VaultChange::Created(file) | VaultChange::Modified(file) if file.path == board_path => {
            watcher.notify_board_modify();
        }
        VaultChange::Created(file) => watcher.notify_create(file),
        VaultChange::Modified(file) => watcher.notify_modify(file),
        VaultChange::Removed(file) => watcher.notify_delete(&file),
        VaultChange::Renamed { from, to } => watcher.notify_rename(to, &from),
    }
}

/// Vault path of a markdown file outside dot-directories.
fn markdown_path(vault: &FsVault, path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        return None;
    }
    let relative = path.strip_prefix(vault.root()).ok()?;
    let hidden = relative.components().any(|c| match c {
        Component::Normal(part) => part.to_str().is_none_or(|s| s.starts_with('.')),
        _ => true,
    });
    if hidden {
        return None;
    }
    vault.vault_path(path)
}

/// Translate one notify event into vault changes.
pub fn classify(vault: &FsVault, event: &Event) -> Vec<VaultChange> {
    let file_at = |idx: usize| {
        event
            .paths
            .get(idx)
            .and_then(|p| markdown_path(vault, p))
            .map(VaultFile::new)
    };
    let each = |make: fn(VaultFile) -> VaultChange| -> Vec<VaultChange> {
        event
            .paths
            .iter()
            .filter_map(|p| markdown_path(vault, p))
            .map(|p| make(VaultFile::new(p)))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => each(VaultChange::Created),
        EventKind::Remove(_) => each(VaultChange::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match (file_at(0), file_at(1)) {
            (Some(from), Some(to)) => vec![VaultChange::Renamed { from: from.path, to }],
            (Some(from), None) => vec![VaultChange::Removed(from)],
            (None, Some(to)) => vec![VaultChange::Created(to)],
            (None, None) => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(VaultChange::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(VaultChange::Created),
        EventKind::Modify(_) => each(VaultChange::Modified),
        _ => Vec::new(),
    }
}
