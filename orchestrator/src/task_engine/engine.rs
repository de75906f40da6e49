//! Autonomous plan/execute/replan/prioritize loop for a single objective, driven entirely
//! through the Interaction Loop: three named templates (`task/execute`, `task/task`,
//! `task/priority`) own all of the engine's reasoning, this module only owns the queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::context::{RequestContext, UserId};
use crate::domain::{Agent, Prompt, PromptKey};
use crate::error::OrchestratorError;
use crate::interaction::InteractionLoop;
use crate::prompt::template::{TemplateValue, TemplateVars};
use crate::repository::{AgentRepository, PromptRepository};

use super::queue::{is_sentinel, OutputLine, TaskQueue};

const SEED_TASK: &str = "Develop a task list to complete the objective; return 'None' if not necessary.";
const TEMPLATE_CATEGORY: &str = "task";
const DEFAULT_SHOTS: usize = 3;
const OUTPUT_BUFFER: usize = 32;

/// Drives one objective to completion (or cancellation), emitting one [`OutputLine`] per
/// queue iteration plus a final stop marker.
pub struct TaskEngine {
    prompts: Arc<dyn PromptRepository>,
    agents: Arc<dyn AgentRepository>,
    interaction: Arc<InteractionLoop>,
    shots: usize,
}

impl TaskEngine {
    pub fn new(prompts: Arc<dyn PromptRepository>, agents: Arc<dyn AgentRepository>, interaction: Arc<InteractionLoop>) -> Self {
        Self { prompts, agents, interaction, shots: DEFAULT_SHOTS }
    }

    pub fn with_shots(mut self, shots: usize) -> Self {
        self.shots = shots.max(1);
        self
    }

    /// Spawns the loop on the runtime and returns a stream of its output lines. The loop
    /// keeps running (and sending) until it hits a stop condition; a dropped receiver is
    /// treated the same as cancellation from the consumer's side.
    pub fn run(
        &self,
        ctx: RequestContext,
        owner: UserId,
        agent_name: String,
        objective: String,
        smart: bool,
        conversation_id: Uuid,
    ) -> ReceiverStream<OutputLine> {
        let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
        let worker = TaskEngine {
            prompts: self.prompts.clone(),
            agents: self.agents.clone(),
            interaction: self.interaction.clone(),
            shots: self.shots,
        };
        tokio::spawn(async move {
            worker.drive(ctx, owner, agent_name, objective, smart, conversation_id, tx).await;
        });
        ReceiverStream::new(rx)
    }

    async fn drive(
        &self,
        ctx: RequestContext,
        owner: UserId,
        agent_name: String,
        objective: String,
        smart: bool,
        conversation_id: Uuid,
        tx: mpsc::Sender<OutputLine>,
    ) {
        let mut queue = TaskQueue::new(objective.clone());
        if queue.is_empty() {
            queue.push(SEED_TASK);
        }

        loop {
            if ctx.is_cancelled() {
                queue.record_stopped("cancelled");
                let _ = tx.send(queue.log().last().cloned().unwrap()).await;
                return;
            }

            let Some(task) = queue.pop_front() else {
                queue.record_stopped("queue empty");
                let _ = tx.send(queue.log().last().cloned().unwrap()).await;
                return;
            };
            if is_sentinel(&task.name) {
                queue.record_stopped(format!("sentinel task name {:?}", task.name));
                let _ = tx.send(queue.log().last().cloned().unwrap()).await;
                return;
            }

            let agent = match self.agents.get(&owner, &agent_name).await {
                Ok(Some(agent)) => agent,
                Ok(None) => {
                    queue.record_stopped(format!("agent {agent_name} not found"));
                    let _ = tx.send(queue.log().last().cloned().unwrap()).await;
                    return;
                }
                Err(e) => {
                    queue.record_stopped(format!("agent lookup failed: {e}"));
                    let _ = tx.send(queue.log().last().cloned().unwrap()).await;
                    return;
                }
            };

            // Execute: any failure becomes the task's result text, the loop continues.
            let result_text = match self.execute_step(&ctx, &agent, &task.name, smart, conversation_id).await {
                Ok(text) => text,
                Err(e) => format!("error: {}", e.detail()),
            };
            queue.record_completed(task.task_id, task.name.clone(), result_text.clone());
            if tx.send(queue.log().last().cloned().unwrap()).await.is_err() {
                return;
            }

            // Creation: ask the planning template for a fresh, ordered task list.
            if let Ok(new_names) = self.plan_new_tasks(&ctx, &agent, &objective, &task.name, &result_text, &queue).await {
                for name in new_names {
                    if !name.trim().is_empty() {
                        queue.push(name);
                    }
                }
            }

            // Prioritize: ask the priority template to reorder what remains.
            if let Ok(order) = self.prioritize(&ctx, &agent, &objective, &queue).await {
                queue.reorder(&order);
            }
        }
    }

    async fn execute_step(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        task_name: &str,
        smart: bool,
        conversation_id: Uuid,
    ) -> Result<String, OrchestratorError> {
        let template = self.get_template(&agent.owner, "execute").await?;
        if smart {
            self.run_smart(ctx, agent, &template, task_name, conversation_id).await
        } else {
            self.run_interaction(ctx, agent, &template, task_name, TemplateVars::new(), conversation_id).await
        }
    }

    async fn plan_new_tasks(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        objective: &str,
        task_name: &str,
        result_text: &str,
        queue: &TaskQueue,
    ) -> Result<Vec<String>, OrchestratorError> {
        let template = self.get_template(&agent.owner, "task").await?;
        let mut vars = TemplateVars::new();
        vars.insert("result".to_string(), TemplateValue::String(result_text.to_string()));
        vars.insert("task_description".to_string(), TemplateValue::String(task_name.to_string()));
        vars.insert("tasks".to_string(), TemplateValue::List(queue.names()));
        let response = self.run_interaction(ctx, agent, &template, objective, vars, Uuid::new_v4()).await?;
        Ok(lines_of(&response))
    }

    async fn prioritize(&self, ctx: &RequestContext, agent: &Agent, objective: &str, queue: &TaskQueue) -> Result<Vec<String>, OrchestratorError> {
        let template = self.get_template(&agent.owner, "priority").await?;
        let mut vars = TemplateVars::new();
        vars.insert("task_names".to_string(), TemplateValue::List(queue.names()));
        let response = self.run_interaction(ctx, agent, &template, objective, vars, Uuid::new_v4()).await?;
        Ok(lines_of(&response))
    }

    /// `shots` independent executions of the same step, reduced to one answer by a
    /// researcher/resolver template when more than one candidate comes back.
    async fn run_smart(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        template: &Prompt,
        task_name: &str,
        conversation_id: Uuid,
    ) -> Result<String, OrchestratorError> {
        let attempts = (0..self.shots).map(|_| self.run_interaction(ctx, agent, template, task_name, TemplateVars::new(), conversation_id));
        let candidates = futures::future::join_all(attempts)
            .await
            .into_iter()
            .collect::<Result<Vec<String>, OrchestratorError>>()?;

        if candidates.len() <= 1 {
            return Ok(candidates.into_iter().next().unwrap_or_default());
        }

        let resolver = self.get_template(&agent.owner, "resolve").await?;
        let mut vars = TemplateVars::new();
        vars.insert("candidates".to_string(), TemplateValue::List(candidates));
        self.run_interaction(ctx, agent, &resolver, task_name, vars, conversation_id).await
    }

    async fn run_interaction(
        &self,
        ctx: &RequestContext,
        agent: &Agent,
        template: &Prompt,
        input: &str,
        vars: TemplateVars,
        conversation_id: Uuid,
    ) -> Result<String, OrchestratorError> {
        let message = self.interaction.run(ctx, agent, conversation_id, template, None, input, vars).await?;
        Ok(message.content)
    }

    async fn get_template(&self, owner: &UserId, name: &str) -> Result<Prompt, OrchestratorError> {
        let key = PromptKey { category: TEMPLATE_CATEGORY.to_string(), name: name.to_string(), user_id: owner.clone() };
        self.prompts
            .get(&key)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("{TEMPLATE_CATEGORY}/{name} prompt")))
    }
}

fn lines_of(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::driver::InferenceDriver;
    use crate::llm::mock::MockLlmProvider;
    use crate::llm::provider::LLMProvider;
    use crate::memory::{Embedder, InMemoryVectorStore, MemoryStore};
    use crate::prompt::composer::PromptComposer;
    use crate::repository::{InMemoryAgentRepository, InMemoryConversationRepository, InMemoryPromptRepository};
    use crate::tools::registry::ToolRegistry;
    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    struct MockEmbedder;

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, OrchestratorError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dim(&self) -> usize {
            2
        }
    }

    fn owner() -> UserId {
        UserId("u1".into())
    }

    async fn setup(provider: Arc<dyn LLMProvider>) -> (TaskEngine, Arc<InMemoryAgentRepository>, Arc<InMemoryPromptRepository>) {
        let memory = Arc::new(MemoryStore::new(Arc::new(MockEmbedder), Arc::new(InMemoryVectorStore::new())));
        let tools = Arc::new(ToolRegistry::new());
        let composer = Arc::new(PromptComposer::new(memory.clone(), tools.clone(), Arc::new(MockEmbedder)));
        let driver = Arc::new(InferenceDriver::new(provider));
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let interaction = Arc::new(InteractionLoop::new(composer, driver, tools, memory, conversations));

        let agents = Arc::new(InMemoryAgentRepository::new());
        agents.add(Agent::new(owner(), "planner")).await.unwrap();

        let prompts = Arc::new(InMemoryPromptRepository::new());
        prompts.add(Prompt::new(TEMPLATE_CATEGORY, "execute", owner(), "{user_input}")).await.unwrap();
        prompts.add(Prompt::new(TEMPLATE_CATEGORY, "task", owner(), "{task_description} -> {result}")).await.unwrap();
        prompts.add(Prompt::new(TEMPLATE_CATEGORY, "priority", owner(), "{task_names}")).await.unwrap();

        let engine = TaskEngine::new(prompts.clone(), agents.clone(), interaction);
        (engine, agents, prompts)
    }

    #[tokio::test]
    async fn seeded_run_stops_when_planner_returns_none() {
        // First call answers the seed task's "execute" turn; second call is the "task"
        // creation turn, which proposes a single follow-up task named "None".
        let provider = Arc::new(MockLlmProvider::sequence(vec![
            "drafted a plan".to_string(),
            "None".to_string(),
            "None".to_string(),
        ]));
        let (engine, _agents, _prompts) = setup(provider).await;
        let ctx = RequestContext::new(owner());

        let mut stream = engine.run(ctx, owner(), "planner".to_string(), "ship the feature".to_string(), false, Uuid::new_v4());

        let first = stream.next().await.unwrap();
        match first {
            OutputLine::TaskCompleted { task_name, result, .. } => {
                assert_eq!(task_name, SEED_TASK);
                assert_eq!(result, "drafted a plan");
            }
            other => panic!("expected a completed seed task, got {other:?}"),
        }

        let second = stream.next().await.unwrap();
        assert!(matches!(second, OutputLine::Stopped { .. }));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn cancelled_before_first_pop_emits_a_single_stop_marker() {
        let provider = Arc::new(MockLlmProvider::fixed("unused", 10_000));
        let (engine, _agents, _prompts) = setup(provider).await;
        let ctx = RequestContext::new(owner());
        ctx.cancellation_token().cancel();

        let mut stream = engine.run(ctx, owner(), "planner".to_string(), "ship the feature".to_string(), false, Uuid::new_v4());
        let only = stream.next().await.unwrap();
        assert!(matches!(only, OutputLine::Stopped { reason } if reason == "cancelled"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn missing_agent_stops_the_run_immediately() {
        let provider = Arc::new(MockLlmProvider::fixed("unused", 10_000));
        let (engine, _agents, _prompts) = setup(provider).await;
        let ctx = RequestContext::new(owner());

        let mut stream = engine.run(ctx, owner(), "ghost".to_string(), "ship the feature".to_string(), false, Uuid::new_v4());
        let only = stream.next().await.unwrap();
        match only {
            OutputLine::Stopped { reason } => assert!(reason.contains("not found")),
            other => panic!("expected a stop marker, got {other:?}"),
        }
    }
}
