//! Interaction Loop (C5): runs one user turn through compose -> infer -> tool dispatch ->
//! validate -> persist, retrying invalid JSON with shrinking retrieved context.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::domain::{Agent, Message, Prompt, Role};
use crate::error::OrchestratorError;
use crate::interaction::state::InteractionState;
use crate::llm::driver::{InferenceDriver, InferenceRequest};
use crate::llm::json_extract::extract_and_parse;
use crate::memory::{CollectionId, MemoryStore};
use crate::prompt::composer::{CompositionContext, PromptComposer};
use crate::prompt::template::TemplateVars;
use crate::repository::ConversationRepository;
use crate::tools::ToolRegistry;

/// Invalid-JSON retries before the raw text response is accepted verbatim.
const MAX_JSON_RETRIES: u32 = 3;

fn wants_tools(body: &str) -> bool {
    body.contains("{COMMANDS}") || body.contains("{command_list}")
}

/// Drives one user turn against a template, optionally validating the result against a
/// second template before persisting.
pub struct InteractionLoop {
    composer: Arc<PromptComposer>,
    driver: Arc<InferenceDriver>,
    tools: Arc<ToolRegistry>,
    memory: Arc<MemoryStore>,
    conversations: Arc<dyn ConversationRepository>,
}

impl InteractionLoop {
    pub fn new(
        composer: Arc<PromptComposer>,
        driver: Arc<InferenceDriver>,
        tools: Arc<ToolRegistry>,
        memory: Arc<MemoryStore>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            composer,
            driver,
            tools,
            memory,
            conversations,
        }
    }

    /// Runs `template` for `user_input` against `agent` inside `conversation_id`.
    /// `validate_template`, if given, runs only when `template` itself declared
    /// `{COMMANDS}` — matching the majority path where a second pass is only useful after
    /// a tool-dispatching turn.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        conversation_id: Uuid,
        template: &Prompt,
        validate_template: Option<&Prompt>,
        user_input: &str,
        extra_vars: TemplateVars,
    ) -> Result<Message, OrchestratorError> {
        if ctx.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let conversation_collection = CollectionId::Conversation(conversation_id);
        let template_wants_tools = wants_tools(&template.body);
        let mut response = self
            .compose_and_infer_with_retry(ctx, agent, &conversation_collection, template, user_input, extra_vars, template_wants_tools)
            .await?;

        if template_wants_tools {
            if ctx.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }
            if let Some(validate_template) = validate_template {
                debug!(state = ?InteractionState::Validating, "running validation pass");
                response = self
                    .validate(ctx, agent, &conversation_collection, validate_template, user_input, &response)
                    .await?;
            }
        }

        if ctx.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        debug!(state = ?InteractionState::Persisting, conversation = %conversation_id, "persisting turn");
        let now = Utc::now();
        self.conversations.append(conversation_id, Role::User, user_input, now).await?;
        let assistant_message = self.conversations.append(conversation_id, Role::Assistant, &response, now).await?;

        self.memory.write_text(CollectionId::DURABLE, user_input, None, None).await?;
        self.memory.write_text(CollectionId::DURABLE, &response, None, None).await?;
        self.memory.write_text(conversation_collection.clone(), user_input, None, None).await?;
        self.memory.write_text(conversation_collection, &response, None, None).await?;

        debug!(state = ?InteractionState::Done, "turn complete");
        Ok(assistant_message)
    }

    /// ComposingPrompt -> Inferring -> (ToolDispatch?), retrying up to
    /// [`MAX_JSON_RETRIES`] times on invalid JSON, each retry shrinking the retrieved
    /// context count by one to reduce distraction.
    #[allow(clippy::too_many_arguments)]
    async fn compose_and_infer_with_retry(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        collection: &CollectionId,
        template: &Prompt,
        user_input: &str,
        extra_vars: TemplateVars,
        dispatch_tools: bool,
    ) -> Result<String, OrchestratorError> {
        let mut k = agent.settings.context_results;

        for attempt in 1..=MAX_JSON_RETRIES {
            if ctx.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }

            debug!(state = ?InteractionState::ComposingPrompt, attempt, k, "composing prompt");
            let comp_ctx = CompositionContext {
                user_input: Some(user_input.to_string()),
                context_results: k,
                min_score: 0.0,
                ..Default::default()
            };
            let (rendered, token_count) = self
                .composer
                .compose(template, agent, collection, &comp_ctx, extra_vars.clone())
                .await?;

            if ctx.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }

            debug!(state = ?InteractionState::Inferring, attempt, "inferring");
            let (response, _) = self
                .driver
                .infer(InferenceRequest {
                    rendered_prompt: rendered,
                    estimated_input_tokens: token_count as u32,
                    min_output_floor: agent.settings.max_output_floor,
                    safety_margin: agent.settings.safety_margin,
                    want_json: false,
                })
                .await?;

            if !dispatch_tools {
                return Ok(response.text);
            }

            match extract_and_parse(&response.text) {
                Some(parsed) => {
                    debug!(state = ?InteractionState::ToolDispatch, "dispatching commands");
                    return Ok(self.dispatch_commands(ctx, agent, parsed).await);
                }
                None if attempt < MAX_JSON_RETRIES => {
                    warn!(attempt, "response was not valid JSON, retrying with reduced context");
                    k = k.saturating_sub(1);
                }
                None => {
                    warn!("exhausted JSON retries, persisting raw response");
                    return Ok(response.text);
                }
            }
        }
        unreachable!("loop always returns by the final attempt")
    }

    async fn validate(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        collection: &CollectionId,
        validate_template: &Prompt,
        user_input: &str,
        previous_response: &str,
    ) -> Result<String, OrchestratorError> {
        let mut vars = TemplateVars::new();
        vars.insert("previous_response".to_string(), previous_response.to_string().into());

        let comp_ctx = CompositionContext {
            user_input: Some(user_input.to_string()),
            context_results: 0,
            min_score: 0.0,
            ..Default::default()
        };
        let (rendered, token_count) = self.composer.compose(validate_template, agent, collection, &comp_ctx, vars).await?;

        if ctx.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let (response, _) = self
            .driver
            .infer(InferenceRequest {
                rendered_prompt: rendered,
                estimated_input_tokens: token_count as u32,
                min_output_floor: agent.settings.max_output_floor,
                safety_margin: agent.settings.safety_margin,
                want_json: false,
            })
            .await?;

        if !wants_tools(&validate_template.body) {
            return Ok(response.text);
        }
        match extract_and_parse(&response.text) {
            Some(parsed) => Ok(self.dispatch_commands(ctx, agent, parsed).await),
            None => Ok(response.text),
        }
    }

    /// Expects `{thoughts?, plan?, summary?, response?, commands?}`. Runs each entry of
    /// `commands` (tool name -> args) via the registry and appends its result; a malformed
    /// or null-keyed `commands` field aborts dispatch with a soft error appended to the
    /// response rather than failing the turn.
    async fn dispatch_commands(&self, ctx: &RequestContext, agent: &Agent, parsed: Value) -> String {
        let mut response = parsed.get("response").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        match parsed.get("commands") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (name, args) in map {
                    if ctx.is_cancelled() {
                        break;
                    }
                    if name.trim().is_empty() {
                        response.push_str("\n\n[tool dispatch aborted: missing command name]");
                        break;
                    }
                    if !agent.enabled_command_names().contains(&name.as_str()) {
                        response.push_str(&format!("\n\n[tool {name} is not enabled for this agent]"));
                        continue;
                    }
                    match self.tools.execute(name, args.clone(), ctx).await {
                        Ok(text) => response.push_str(&format!("\n\n{text}")),
                        Err(err) => response.push_str(&format!("\n\n[tool {name} failed: {err}]")),
                    }
                }
            }
            Some(_) => response.push_str("\n\n[tool dispatch aborted: malformed commands field]"),
        }
        response
    }
}
