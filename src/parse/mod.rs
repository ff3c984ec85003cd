pub mod collection_parser;
pub mod dialect;
pub mod factory;
pub mod task_parser;
pub mod task_serializer;

pub use collection_parser::{is_heading, parse_collection};
pub use factory::{FixedProbe, FormatProbe, TaskFactory};
pub use task_parser::{is_task_line, parse_task_line, split_checkbox};
pub use task_serializer::{serialize_task, serialize_task_line};
