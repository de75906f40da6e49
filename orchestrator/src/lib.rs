//! # Orchestrator
//!
//! Multi-tenant LLM agent orchestration core: prompt composition, inference budgeting,
//! tool dispatch, chains, and an autonomous task loop, all built on injected ports so the
//! core never depends on a concrete LLM vendor, vector database, or table layout.
//!
//! ## Design principles
//!
//! - **Ports, not processes**: [`memory::Embedder`], [`memory::VectorStore`],
//!   [`llm::LLMProvider`], [`tools::Tool`], and the [`repository`] traits are the only
//!   seams this crate knows about. In-memory adapters ship alongside each port so the
//!   whole core is runnable and testable without any external service.
//! - **Explicit context everywhere**: every operation takes a [`context::RequestContext`]
//!   instead of reaching for ambient state; cancelling it cancels the call tree below it.
//! - **One state machine per concern**: the Interaction Loop (C5) drives one turn, the
//!   Chain Engine (C6) drives one linear pipeline, the Task Engine (C7) drives one
//!   autonomous objective, and the Task Monitor (C8) drives the sweep across all of them.
//!
//! ## Main modules
//!
//! - [`context`]: [`context::RequestContext`], [`context::UserId`] — identity and
//!   cancellation threaded through every call.
//! - [`domain`]: [`domain::Agent`], [`domain::Conversation`], [`domain::Chain`],
//!   [`domain::Prompt`], [`domain::TaskItem`] — the entities the core reasons about.
//! - [`repository`]: DB port and in-memory adapters for every domain entity.
//! - [`memory`]: [`memory::MemoryStore`] (C1) — chunking, embedding, and ranked recall.
//! - [`prompt`]: [`prompt::PromptComposer`] (C2) and the `{name}` template renderer.
//! - [`tools`]: [`tools::ToolRegistry`] (C3) — tool resolution, validation, and dispatch.
//! - [`llm`]: [`llm::InferenceDriver`] (C4) — budgeted, retried inference calls.
//! - [`interaction`]: [`interaction::InteractionLoop`] (C5) — one turn end to end.
//! - [`chain_engine`]: [`chain_engine::ChainEngine`] (C6) — linear step pipelines.
//! - [`task_engine`]: [`task_engine::TaskEngine`] (C7) — the autonomous objective loop.
//! - [`monitor`]: [`monitor::TaskMonitor`] (C8) — the cross-user deferred-task sweep.
//! - [`error`]: [`error::OrchestratorError`], [`error::ErrorKind`] — the error taxonomy
//!   every public call returns.
//!
//! Key types are re-exported at crate root: `use orchestrator::{Orchestrator, RequestContext};`.

pub mod chain_engine;
pub mod context;
pub mod domain;
pub mod error;
pub mod interaction;
pub mod llm;
pub mod memory;
pub mod monitor;
pub mod prompt;
pub mod repository;
pub mod task_engine;
pub mod tools;

pub use chain_engine::{ChainEngine, ChainRunOutput};
pub use context::{RequestContext, UserId};
pub use domain::{
    Agent, AgentSettings, AgentStatus, Chain, ChainEditError, ChainStep, ChainStepResponse, Conversation, Message, NonMonotonicTimestamp,
    Prompt, PromptKey, PromptType, Role, TaskItem,
};
pub use error::{ErrorKind, OrchestratorError, ToolError};
pub use interaction::{InteractionLoop, InteractionState};
pub use llm::{InferResponse, InferenceDriver, InferenceRequest, LLMProvider, TokenUsage};
pub use memory::{CollectionId, CollectionSnapshot, Embedder, MemoryRecord, MemoryStore, ScoredRecord, VectorStore};
pub use monitor::TaskMonitor;
pub use prompt::{CompositionContext, PromptComposer, TemplateValue, TemplateVars};
pub use repository::{
    AgentRepository, ChainRepository, ConversationRepository, InMemoryAgentRepository, InMemoryChainRepository, InMemoryConversationRepository,
    InMemoryPromptRepository, InMemoryTaskItemRepository, PromptRepository, TaskItemRepository,
};
pub use task_engine::{OutputLine, TaskEngine};
pub use tools::{ArgSpec, ArgsSchema, Tool, ToolRegistry};

use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// Wires every port into the Interaction Loop, Chain Engine, and Task Engine, and exposes
/// the core's three driven operations plus the CRUD repositories behind public fields —
/// `orchestrator.prompts.add(...)`, `orchestrator.chains.add_step(...)`, and so on are the
/// `prompt.*`/`chain.*`/`agent.*` surfaces; `interact`/`run_chain`/`run_task` are the three
/// that require the composed engines rather than plain storage.
pub struct Orchestrator {
    pub agents: Arc<dyn AgentRepository>,
    pub chains: Arc<dyn ChainRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub prompts: Arc<dyn PromptRepository>,
    pub task_items: Arc<dyn TaskItemRepository>,
    pub memory: Arc<MemoryStore>,
    pub tools: Arc<ToolRegistry>,
    interaction: Arc<InteractionLoop>,
    chain_engine: Arc<ChainEngine>,
    task_engine: Arc<TaskEngine>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        llm_provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        agents: Arc<dyn AgentRepository>,
        chains: Arc<dyn ChainRepository>,
        conversations: Arc<dyn ConversationRepository>,
        prompts: Arc<dyn PromptRepository>,
        task_items: Arc<dyn TaskItemRepository>,
    ) -> Self {
        let memory = Arc::new(MemoryStore::new(embedder.clone(), vector_store));
        let composer = Arc::new(PromptComposer::new(memory.clone(), tools.clone(), embedder));
        let driver = Arc::new(InferenceDriver::new(llm_provider));
        let interaction = Arc::new(InteractionLoop::new(composer, driver, tools.clone(), memory.clone(), conversations.clone()));
        let chain_engine = Arc::new(ChainEngine::new(chains.clone(), prompts.clone(), agents.clone(), interaction.clone(), tools.clone()));
        let task_engine = Arc::new(TaskEngine::new(prompts.clone(), agents.clone(), interaction.clone()));

        Self {
            agents,
            chains,
            conversations,
            prompts,
            task_items,
            memory,
            tools,
            interaction,
            chain_engine,
            task_engine,
        }
    }

    /// Builds a [`TaskMonitor`] sharing this orchestrator's agents, prompts, conversations,
    /// and Task Engine, driving `self.task_items` on a 60 second sweep.
    pub fn task_monitor(&self, signing_key: Vec<u8>) -> TaskMonitor {
        TaskMonitor::new(self.task_items.clone(), self.task_engine.clone(), self.conversations.clone(), signing_key)
    }

    /// `interact(user, agent, conversation, template, args, cancellation) -> AssistantMessage`:
    /// runs one turn of the Interaction Loop and returns the persisted assistant message.
    pub async fn interact(
        &self,
        ctx: &RequestContext,
        agent_name: &str,
        conversation_id: Uuid,
        template: &Prompt,
        validate_template: Option<&Prompt>,
        user_input: &str,
        args: TemplateVars,
    ) -> Result<Message, OrchestratorError> {
        let agent = self
            .agents
            .get(&ctx.user, agent_name)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {agent_name}")))?;
        self.interaction.run(ctx, &agent, conversation_id, template, validate_template, user_input, args).await
    }

    /// `run_chain(user, chain_name, user_input, from_step, agent_override?, cancellation) ->
    /// responses | last_response`: drives a chain from `from_step` onward. The caller picks
    /// which half of [`ChainRunOutput`] it needs.
    pub async fn run_chain(
        &self,
        ctx: &RequestContext,
        chain_name: &str,
        user_input: &str,
        from_step: u32,
        agent_override: Option<&str>,
        conversation_id: Uuid,
    ) -> Result<ChainRunOutput, OrchestratorError> {
        let owner = ctx.user.clone();
        self.chain_engine.run(ctx, &owner, chain_name, user_input, from_step, agent_override, conversation_id).await
    }

    /// `run_task(user, agent, objective, smart?, cancellation) -> Stream<OutputLine>`:
    /// spawns the autonomous plan/execute/replan/prioritize loop and streams its progress.
    pub fn run_task(&self, ctx: RequestContext, agent_name: String, objective: String, smart: bool, conversation_id: Uuid) -> ReceiverStream<OutputLine> {
        let owner = ctx.user.clone();
        self.task_engine.run(ctx, owner, agent_name, objective, smart, conversation_id)
    }

    /// `agent.get_config`: the one agent surface not already a direct [`AgentRepository`]
    /// method — just the stored settings.
    pub async fn agent_config(&self, owner: &UserId, name: &str) -> Result<AgentSettings, OrchestratorError> {
        let agent = self.agents.get(owner, name).await?.ok_or_else(|| OrchestratorError::NotFound(format!("agent {name}")))?;
        Ok(agent.settings)
    }

    /// Runs a chain and returns its steps as envelope-stamped wire events (`run_id` plus
    /// an increasing `sequence`) instead of the raw [`ChainRunOutput`] — what a transport
    /// layer forwards to a streaming client.
    pub async fn run_chain_events(
        &self,
        ctx: &RequestContext,
        chain_name: &str,
        user_input: &str,
        from_step: u32,
        agent_override: Option<&str>,
        conversation_id: Uuid,
        run_id: String,
    ) -> Result<Vec<serde_json::Value>, OrchestratorError> {
        let output = self.run_chain(ctx, chain_name, user_input, from_step, agent_override, conversation_id).await?;
        let mut envelope = stream_event::EnvelopeState::new(run_id);
        Ok(output
            .to_output_events()
            .iter()
            .map(|event| envelope.to_json(event).unwrap_or_default())
            .collect())
    }

    /// Streaming counterpart to [`Orchestrator::run_task`]: each [`OutputLine`] is mapped
    /// to its wire event and stamped with a run envelope as it is produced.
    pub fn run_task_events(
        &self,
        ctx: RequestContext,
        agent_name: String,
        objective: String,
        smart: bool,
        conversation_id: Uuid,
        run_id: String,
    ) -> impl futures::Stream<Item = serde_json::Value> {
        let mut envelope = stream_event::EnvelopeState::new(run_id);
        futures::StreamExt::map(self.run_task(ctx, agent_name, objective, smart, conversation_id), move |line| {
            envelope.to_json(&line.to_output_event()).unwrap_or_default()
        })
    }
}
