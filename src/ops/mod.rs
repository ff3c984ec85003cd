pub mod carry_over;
pub mod migrate;
pub mod provider;
pub mod reverse_sync;
pub mod sync;
pub mod watcher;
