//! Inference Driver (C4): one LLM call with token budgeting, retry, and optional
//! structured-output validation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::error::{ErrorKind, OrchestratorError};
use crate::llm::json_extract::extract_and_parse;
use crate::llm::provider::{InferResponse, LLMProvider};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(100);

const REFORMAT_TEMPLATE: &str = "Your previous response was not valid JSON. Reformat the following as a single JSON object and return nothing else:\n\n{previous_response}";

pub struct InferenceRequest {
    pub rendered_prompt: String,
    pub estimated_input_tokens: u32,
    pub min_output_floor: u32,
    pub safety_margin: u32,
    pub want_json: bool,
}

pub struct InferenceDriver {
    provider: Arc<dyn LLMProvider>,
}

impl InferenceDriver {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    fn budget(&self, req: &InferenceRequest) -> Result<u32, OrchestratorError> {
        let max_tokens = self.provider.max_tokens();
        let spent = req.estimated_input_tokens + req.safety_margin;
        if spent > max_tokens {
            return Err(OrchestratorError::BudgetExceeded(format!(
                "estimated input ({}) plus safety margin ({}) exceeds provider limit ({})",
                req.estimated_input_tokens, req.safety_margin, max_tokens
            )));
        }
        Ok((max_tokens - spent).max(req.min_output_floor))
    }

    async fn infer_with_retry(&self, prompt: &str, max_output: u32) -> Result<InferResponse, OrchestratorError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.infer(prompt, max_output).await {
                Ok(response) => return Ok(response),
                Err(err) if err.kind() == ErrorKind::UpstreamFailure && attempt < MAX_ATTEMPTS => {
                    let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                    warn!(attempt, ?backoff, "transient provider failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs one budgeted, retried inference call. When `want_json` is set, extracts the
    /// first balanced JSON object from the response and re-prompts once with a reformat
    /// instruction if parsing fails; the raw text is returned unparsed if that also fails.
    pub async fn infer(&self, req: InferenceRequest) -> Result<(InferResponse, Option<Value>), OrchestratorError> {
        let max_output = self.budget(&req)?;
        let response = self.infer_with_retry(&req.rendered_prompt, max_output).await?;

        if !req.want_json {
            return Ok((response, None));
        }

        if let Some(parsed) = extract_and_parse(&response.text) {
            return Ok((response, Some(parsed)));
        }

        let reformat_prompt = REFORMAT_TEMPLATE.replace("{previous_response}", &response.text);
        let retry_response = self.infer_with_retry(&reformat_prompt, max_output).await?;
        let parsed = extract_and_parse(&retry_response.text);
        Ok((retry_response, parsed))
    }
}
