//! Mock [`LLMProvider`] implementations for tests: a fixed/sequenced responder and a
//! provider that fails transiently before succeeding, to exercise the driver's retry path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use provider_spec::ProviderCapabilities;

use crate::error::OrchestratorError;
use crate::llm::provider::{InferResponse, LLMProvider};

/// Returns a fixed response, or walks a fixed sequence of responses (one per call,
/// repeating the last once exhausted).
pub struct MockLlmProvider {
    responses: Mutex<Vec<String>>,
    cursor: AtomicUsize,
    max_tokens: u32,
}

impl MockLlmProvider {
    pub fn fixed(response: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            responses: Mutex::new(vec![response.into()]),
            cursor: AtomicUsize::new(0),
            max_tokens,
        }
    }

    pub fn sequence(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            cursor: AtomicUsize::new(0),
            max_tokens: 100_000,
        }
    }

    /// Number of `infer` calls served so far, for tests asserting an exact retry count.
    pub fn call_count(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for MockLlmProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::chat_only()
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    async fn infer(&self, _prompt: &str, _max_output: u32) -> Result<InferResponse, OrchestratorError> {
        let responses = self.responses.lock().expect("mock provider mutex poisoned");
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst).min(responses.len() - 1);
        Ok(InferResponse {
            text: responses[idx].clone(),
            usage: None,
        })
    }
}

/// Fails with `UpstreamFailure` for `failures_before_success` calls, then returns `text`.
pub struct FlakyMockProvider {
    remaining_failures: AtomicUsize,
    text: String,
}

impl FlakyMockProvider {
    pub fn new(failures_before_success: usize, text: impl Into<String>) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures_before_success),
            text: text.into(),
        }
    }
}

#[async_trait]
impl LLMProvider for FlakyMockProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::chat_only()
    }

    fn max_tokens(&self) -> u32 {
        100_000
    }

    async fn infer(&self, _prompt: &str, _max_output: u32) -> Result<InferResponse, OrchestratorError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(OrchestratorError::UpstreamFailure("simulated transient failure".into()));
        }
        Ok(InferResponse {
            text: self.text.clone(),
            usage: None,
        })
    }
}
