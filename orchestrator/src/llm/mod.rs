pub mod driver;
pub mod json_extract;
pub mod mock;
pub mod provider;

pub use driver::{InferenceDriver, InferenceRequest};
pub use json_extract::{extract_and_parse, extract_json_object};
pub use provider::{InferResponse, LLMProvider, TokenUsage};
