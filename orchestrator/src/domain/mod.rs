pub mod agent;
pub mod chain;
pub mod conversation;
pub mod prompt;
pub mod task_item;

pub use agent::{Agent, AgentSettings, AgentStatus};
pub use chain::{Chain, ChainEditError, ChainStep, ChainStepResponse, PromptType};
pub use conversation::{Conversation, Message, NonMonotonicTimestamp, Role};
pub use prompt::{Prompt, PromptKey};
pub use task_item::TaskItem;
