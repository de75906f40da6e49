pub mod engine;
pub mod queue;

pub use engine::TaskEngine;
pub use queue::{is_sentinel, OutputLine, QueuedTask, TaskQueue};
