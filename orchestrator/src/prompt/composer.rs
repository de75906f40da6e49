//! Prompt Composer (C2): renders a named template, resolving reserved placeholders from
//! the active agent, memory, tools, and caller-supplied context.

use std::sync::Arc;

use crate::domain::{Agent, Prompt};
use crate::error::OrchestratorError;
use crate::memory::{CollectionId, Embedder, MemoryStore};
use crate::prompt::template::{render, TemplateValue, TemplateVars};
use crate::tools::ToolRegistry;

/// Caller-supplied context for one composition. Any field left `None` leaves the
/// corresponding reserved placeholder unresolved (rendered literally if referenced).
#[derive(Default)]
pub struct CompositionContext {
    pub user_input: Option<String>,
    pub objective: Option<String>,
    pub conversation_history: Option<String>,
    pub context_results: usize,
    pub min_score: f32,
}

pub struct PromptComposer {
    memory: Arc<MemoryStore>,
    tools: Arc<ToolRegistry>,
    embedder: Arc<dyn Embedder>,
}

impl PromptComposer {
    pub fn new(memory: Arc<MemoryStore>, tools: Arc<ToolRegistry>, embedder: Arc<dyn Embedder>) -> Self {
        Self { memory, tools, embedder }
    }

    /// Renders `prompt.body` against `agent` and `ctx`, also applying any caller-supplied
    /// `extra_vars` (e.g. chain `{STEPn}` substitutions, which are not reserved). Returns
    /// the rendered text and its approximate token count.
    pub async fn compose(
        &self,
        prompt: &Prompt,
        agent: &Agent,
        collection: &CollectionId,
        ctx: &CompositionContext,
        extra_vars: TemplateVars,
    ) -> Result<(String, usize), OrchestratorError> {
        let body = &prompt.body;
        let mut vars = extra_vars;

        if references(body, "context") {
            let rendered_context = match &ctx.user_input {
                Some(query) if ctx.context_results > 0 => {
                    let hits = self.memory.query(collection, query, ctx.context_results, ctx.min_score).await?;
                    hits.into_iter().map(|h| h.record.text).collect::<Vec<_>>().join("\n\n")
                }
                _ => String::new(),
            };
            vars.insert("context".to_string(), TemplateValue::String(rendered_context));
        }

        if references(body, "COMMANDS") || references(body, "command_list") {
            let block = self.tools.render_command_block(agent);
            vars.insert("COMMANDS".to_string(), TemplateValue::String(block.clone()));
            vars.insert("command_list".to_string(), TemplateValue::String(block));
        }

        vars.insert("agent_name".to_string(), TemplateValue::String(agent.name.clone()));
        if let Some(objective) = &ctx.objective {
            vars.insert("objective".to_string(), TemplateValue::String(objective.clone()));
        }
        if let Some(history) = &ctx.conversation_history {
            vars.insert("conversation_history".to_string(), TemplateValue::String(history.clone()));
        }
        if let Some(user_input) = &ctx.user_input {
            vars.insert("user_input".to_string(), TemplateValue::String(user_input.clone()));
        }

        let rendered = render(body, &vars);
        let token_count = self.embedder.approximate_tokens(&rendered);
        Ok((rendered, token_count))
    }
}

fn references(body: &str, placeholder: &str) -> bool {
    body.contains(&format!("{{{placeholder}}}"))
}
