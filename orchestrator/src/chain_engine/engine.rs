//! Chain Engine (C6): executes a chain's steps strictly in order, substituting
//! `{user_input}`, `{agent_name}`, and `{STEPn}` before each one runs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::context::{RequestContext, UserId};
use crate::domain::chain::PromptType;
use crate::domain::Prompt;
use crate::error::OrchestratorError;
use crate::interaction::InteractionLoop;
use crate::prompt::template::TemplateVars;
use crate::repository::{AgentRepository, ChainRepository, PromptRepository};
use crate::tools::ToolRegistry;

static STEP_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{STEP(\d+)\}").unwrap());

/// Result of [`ChainEngine::run`]: every step's response, plus the last one for callers
/// who only want the tail.
#[derive(Debug)]
pub struct ChainRunOutput {
    pub responses: HashMap<u32, String>,
    pub last_response: String,
}

impl ChainRunOutput {
    /// One `ChainStepComplete` event per step in step-number order, followed by `Done` —
    /// the shape a transport layer stamps with a run envelope before forwarding to a client.
    pub fn to_output_events(&self) -> Vec<stream_event::OutputEvent> {
        let mut steps: Vec<_> = self.responses.iter().collect();
        steps.sort_by_key(|(step_number, _)| **step_number);
        let mut events: Vec<stream_event::OutputEvent> = steps
            .into_iter()
            .map(|(step_number, response)| stream_event::OutputEvent::ChainStepComplete {
                step_number: *step_number,
                response: response.clone(),
            })
            .collect();
        events.push(stream_event::OutputEvent::Done);
        events
    }
}

pub struct ChainEngine {
    chains: Arc<dyn ChainRepository>,
    prompts: Arc<dyn PromptRepository>,
    agents: Arc<dyn AgentRepository>,
    interaction: Arc<InteractionLoop>,
    tools: Arc<ToolRegistry>,
}

impl ChainEngine {
    pub fn new(
        chains: Arc<dyn ChainRepository>,
        prompts: Arc<dyn PromptRepository>,
        agents: Arc<dyn AgentRepository>,
        interaction: Arc<InteractionLoop>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            chains,
            prompts,
            agents,
            interaction,
            tools,
        }
    }

    /// Runs `chain_name`'s steps from `from_step` onward. Steps before `from_step` keep
    /// their last recorded response available for `{STEPn}` reads but are not re-executed.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        owner: &UserId,
        chain_name: &str,
        user_input: &str,
        from_step: u32,
        agent_override: Option<&str>,
        conversation_id: Uuid,
    ) -> Result<ChainRunOutput, OrchestratorError> {
        self.run_boxed(ctx, owner.clone(), chain_name.to_string(), user_input.to_string(), from_step, agent_override.map(String::from), conversation_id)
            .await
    }

    fn run_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        owner: UserId,
        chain_name: String,
        user_input: String,
        from_step: u32,
        agent_override: Option<String>,
        conversation_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<ChainRunOutput, OrchestratorError>> + Send + 'a>> {
        Box::pin(async move {
            let chain = self
                .chains
                .get(&owner, &chain_name)
                .await?
                .ok_or_else(|| OrchestratorError::NotFound(format!("chain {chain_name}")))?;

            let mut responses: HashMap<u32, String> = HashMap::new();
            for step in chain.steps() {
                if step.step_number < from_step {
                    if let Some(r) = chain.latest_response(step.step_number) {
                        responses.insert(step.step_number, r.content.clone());
                    }
                }
            }

            let mut last_response = String::new();
            for step in chain.steps().iter().filter(|s| s.step_number >= from_step) {
                if ctx.is_cancelled() {
                    return Err(OrchestratorError::Cancelled);
                }

                let agent_name = agent_override.clone().unwrap_or_else(|| step.agent_name.clone());

                debug!(step = step.step_number, prompt_type = ?step.prompt_type, "executing chain step");
                let outcome = match expand_payload(&step.payload, &user_input, &agent_name, step.step_number, &responses) {
                    Ok(expanded) => match step.prompt_type {
                        PromptType::Prompt => self.run_prompt_step(ctx, &owner, &agent_name, &step.payload, &expanded, conversation_id).await,
                        PromptType::Command => self.run_command_step(ctx, &agent_name, &expanded).await,
                        PromptType::Chain => self
                            .run_boxed(ctx, owner.clone(), expanded.clone(), user_input.clone(), 1, Some(agent_name.clone()), conversation_id)
                            .await
                            .map(|out| out.last_response),
                    },
                    Err(e) => Err(e),
                };

                match outcome {
                    Ok(text) => {
                        self.chains.record_response(&owner, &chain_name, step.step_number, &text, Utc::now()).await?;
                        responses.insert(step.step_number, text.clone());
                        last_response = text;
                    }
                    Err(_) => {
                        return Err(OrchestratorError::InvalidInput(format!(
                            "failed on step {}; resume with from_step={}",
                            step.step_number, step.step_number
                        )));
                    }
                }
            }

            Ok(ChainRunOutput { responses, last_response })
        })
    }

    /// A slash in the unexpanded payload (`category/name`) looks up a saved template and
    /// runs the expanded payload as its input; otherwise the expanded payload is the
    /// template body itself, run ad hoc.
    async fn run_prompt_step(
        &self,
        ctx: &RequestContext,
        owner: &UserId,
        agent_name: &str,
        raw_payload: &str,
        expanded_payload: &str,
        conversation_id: Uuid,
    ) -> Result<String, OrchestratorError> {
        let agent = self
            .agents
            .get(owner, agent_name)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {agent_name}")))?;

        let (template, input) = if let Some((category, name)) = raw_payload.split_once('/') {
            let key = crate::domain::PromptKey {
                category: category.to_string(),
                name: name.to_string(),
                user_id: owner.clone(),
            };
            let template = self
                .prompts
                .get(&key)
                .await?
                .ok_or_else(|| OrchestratorError::NotFound(format!("prompt {raw_payload}")))?;
            (template, expanded_payload.to_string())
        } else {
            (Prompt::new("chain", "step", owner.clone(), expanded_payload), String::new())
        };

        let message = self
            .interaction
            .run(ctx, &agent, conversation_id, &template, None, &input, TemplateVars::new())
            .await?;
        Ok(message.content)
    }

    /// The expanded payload is a JSON object of tool arguments; `agent_name` names the
    /// tool to invoke (chains have no LLM agent at a Command step).
    async fn run_command_step(&self, ctx: &RequestContext, tool_name: &str, expanded_payload: &str) -> Result<String, OrchestratorError> {
        let args: Value = serde_json::from_str(expanded_payload)
            .map_err(|e| OrchestratorError::InvalidInput(format!("command step payload is not valid JSON args: {e}")))?;
        self.tools.execute(tool_name, args, ctx).await.map_err(OrchestratorError::Tool)
    }
}

/// Substitutes `{user_input}`, `{agent_name}`, and `{STEPn}` in `payload`. A `{STEPn}`
/// reference to a step at or after `current_step` (forward reference) or to a step with
/// no recorded response is `MissingDependency`.
fn expand_payload(
    payload: &str,
    user_input: &str,
    agent_name: &str,
    current_step: u32,
    responses: &HashMap<u32, String>,
) -> Result<String, OrchestratorError> {
    let replaced = payload.replace("{user_input}", user_input).replace("{agent_name}", agent_name);

    let mut missing: Option<u32> = None;
    let result = STEP_REF
        .replace_all(&replaced, |caps: &regex::Captures| {
            let n: u32 = caps[1].parse().unwrap_or(u32::MAX);
            if n >= current_step {
                missing = Some(n);
                String::new()
            } else {
                match responses.get(&n) {
                    Some(text) => text.clone(),
                    None => {
                        missing = Some(n);
                        String::new()
                    }
                }
            }
        })
        .into_owned();

    match missing {
        Some(n) => Err(OrchestratorError::MissingDependency(format!("step {n} has no recorded response"))),
        None => Ok(result),
    }
}
