//! Integration test: the autonomous task loop terminates when the planner names no further
//! work, emitting one `TaskCompleted` line per executed task and a final `Stopped` marker.

use std::sync::Arc;

use async_trait::async_trait;
use orchestrator::llm::mock::MockLlmProvider;
use orchestrator::memory::{Embedder, InMemoryVectorStore};
use orchestrator::repository::{InMemoryAgentRepository, InMemoryChainRepository, InMemoryConversationRepository, InMemoryPromptRepository, InMemoryTaskItemRepository};
use orchestrator::task_engine::OutputLine;
use orchestrator::tools::ToolRegistry;
use orchestrator::{Agent, LLMProvider, OrchestratorError, Orchestrator, Prompt, RequestContext, UserId};
use tokio_stream::StreamExt;
use uuid::Uuid;

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

fn orchestrator_with(provider: Arc<dyn LLMProvider>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(MockEmbedder),
        Arc::new(InMemoryVectorStore::new()),
        provider,
        Arc::new(ToolRegistry::new()),
        Arc::new(InMemoryAgentRepository::new()),
        Arc::new(InMemoryChainRepository::new()),
        Arc::new(InMemoryConversationRepository::new()),
        Arc::new(InMemoryPromptRepository::new()),
        Arc::new(InMemoryTaskItemRepository::new()),
    )
}

#[tokio::test]
async fn task_loop_stops_on_the_planner_sentinel() {
    let owner = UserId("u1".into());
    // First call executes the seed task and returns a real result. Every call after that
    // (planning, prioritizing) returns "None", the sentinel that stops the loop once it is
    // queued as a task name and popped.
    let provider = Arc::new(MockLlmProvider::sequence(vec!["objective satisfied".to_string(), "None".to_string()]));
    let orch = orchestrator_with(provider);
    orch.agents.add(Agent::new(owner.clone(), "assistant")).await.unwrap();
    orch.prompts.add(Prompt::new("task", "execute", owner.clone(), "{user_input}")).await.unwrap();
    orch.prompts.add(Prompt::new("task", "task", owner.clone(), "{task_description} -> {result}")).await.unwrap();
    orch.prompts.add(Prompt::new("task", "priority", owner.clone(), "{task_names}")).await.unwrap();

    let ctx = RequestContext::new(owner.clone());
    let mut stream = orch.run_task(ctx, "assistant".to_string(), "ship the release".to_string(), false, Uuid::new_v4());

    let mut lines = Vec::new();
    while let Some(line) = stream.next().await {
        lines.push(line);
    }

    assert!(matches!(&lines[0], OutputLine::TaskCompleted { result, .. } if result == "objective satisfied"));
    assert!(matches!(lines.last(), Some(OutputLine::Stopped { .. })));
}

#[tokio::test]
async fn cancelling_the_context_stops_the_loop_with_a_single_marker() {
    let owner = UserId("u1".into());
    let provider = Arc::new(MockLlmProvider::fixed("unused", 10_000));
    let orch = orchestrator_with(provider);
    orch.agents.add(Agent::new(owner.clone(), "assistant")).await.unwrap();

    let ctx = RequestContext::new(owner.clone());
    ctx.cancellation_token().cancel();
    let mut stream = orch.run_task(ctx, "assistant".to_string(), "ship the release".to_string(), false, Uuid::new_v4());

    let first = stream.next().await.unwrap();
    assert!(matches!(first, OutputLine::Stopped { reason } if reason == "cancelled"));
    assert!(stream.next().await.is_none());
}
