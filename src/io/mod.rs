pub mod board_manager;
pub mod config_io;
pub mod frontmatter;
pub mod fs_vault;
pub mod periodic;
pub mod probe;
pub mod state;
pub mod vault;
pub mod watcher;
