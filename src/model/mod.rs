pub mod board;
pub mod collection;
pub mod config;
pub mod origin_index;
pub mod snapshot;
pub mod task;

pub use board::*;
pub use collection::*;
pub use config::*;
pub use origin_index::*;
pub use snapshot::*;
pub use task::*;
