use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::io::vault::VaultFile;

/// How long board writes stay attributed to a forward sync after it ends
pub const FORWARD_SYNC_GRACE: Duration = Duration::from_millis(100);

/// Set while a forward sync is writing the board.
///
/// Counts overlapping syncs, so the flag clears only once the last one (and
/// its grace window) is over. Advisory only; nothing waits on it.
#[derive(Debug, Clone, Default)]
pub struct ForwardSyncFlag(Arc<AtomicUsize>);

impl ForwardSyncFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn end(&self) {
        let _ = self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Clear this sync's hold after `grace` has passed.
    pub fn end_after(&self, grace: Duration) {
        let flag = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            flag.end();
        });
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

/// The work a [`Watcher`] triggers once things go quiet.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Push one changed file's tasks to the board.
    async fn forward_sync(&self, file: VaultFile);

    /// Push board completion changes back to source files.
    async fn reverse_sync(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TimerKey {
    File(String),
    Board,
}

struct Pending {
    generation: u64,
    handle: AbortHandle,
}

type Timers = Arc<Mutex<HashMap<TimerKey, Pending>>>;

fn lock(timers: &Mutex<HashMap<TimerKey, Pending>>) -> MutexGuard<'_, HashMap<TimerKey, Pending>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Debounces vault change notifications into sync runs.
///
/// Each file path has its own timer; a new notification for the same path
/// restarts it. Board edits share a single timer. Once a timer fires its
/// sync runs to completion even if more notifications arrive.
pub struct Watcher {
    handler: Arc<dyn SyncHandler>,
    flag: ForwardSyncFlag,
    delay: Duration,
    timers: Timers,
    generation: AtomicU64,
}

impl Watcher {
    pub fn new(handler: Arc<dyn SyncHandler>, flag: ForwardSyncFlag, delay: Duration) -> Self {
        Watcher {
            handler,
            flag,
            delay,
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn notify_create(&self, file: VaultFile) {
        self.notify_modify(file);
    }

    pub fn notify_modify(&self, file: VaultFile) {
        let handler = Arc::clone(&self.handler);
        let key = TimerKey::File(file.path.clone());
        self.schedule(key, async move { handler.forward_sync(file).await });
    }

    pub fn notify_rename(&self, file: VaultFile, old_path: &str) {
        self.cancel(&TimerKey::File(old_path.to_string()));
        self.notify_modify(file);
    }

    pub fn notify_delete(&self, file: &VaultFile) {
        self.cancel(&TimerKey::File(file.path.clone()));
    }

    /// Schedule a reverse sync, unless the edit came from a forward sync.
    pub fn notify_board_modify(&self) {
        if self.flag.is_set() {
            debug!("board written by forward sync, not reversing");
            return;
        }
        let handler = Arc::clone(&self.handler);
        self.schedule(TimerKey::Board, async move { handler.reverse_sync().await });
    }

    /// Number of timers still waiting to fire.
    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }

    fn cancel(&self, key: &TimerKey) {
        if let Some(pending) = lock(&self.timers).remove(key) {
            pending.handle.abort();
        }
    }

    fn schedule(&self, key: TimerKey, work: impl Future<Output = ()> + Send + 'static) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        let delay = self.delay;

        // Hold the lock until the new entry is in, so the timer cannot fire
        // and miss its own entry.
        let mut guard = lock(&self.timers);
        if let Some(old) = guard.remove(&key) {
            old.handle.abort();
        }
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut guard = lock(&timers);
                match guard.get(&task_key) {
                    Some(pending) if pending.generation == generation => {
                        guard.remove(&task_key);
                    }
                    _ => return,
                }
            }
            work.await;
        });
        guard.insert(
            key,
            Pending {
                generation,
                handle: task.abort_handle(),
            },
        );
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        for (_, pending) in lock(&self.timers).drain() {
            pending.handle.abort();
        }
    }
}
