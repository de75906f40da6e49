//! LLMProvider: the injected inference port. Concrete adapters (OpenAI-compatible,
//! local models) live outside this crate; only a mock ships here for tests.

use async_trait::async_trait;
use provider_spec::ProviderCapabilities;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct InferResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// One inference backend. `embed`/`tts`/`transcribe`/`image` are only called when
/// [`LLMProvider::capabilities`] declares the corresponding flag; the default
/// implementations return `UpstreamFailure` so a misconfigured agent fails loudly
/// rather than silently no-opping.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn capabilities(&self) -> ProviderCapabilities;

    fn max_tokens(&self) -> u32;

    async fn infer(&self, prompt: &str, max_output: u32) -> Result<InferResponse, OrchestratorError>;

    async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, OrchestratorError> {
        Err(OrchestratorError::UpstreamFailure("provider does not implement embed".into()))
    }
}
