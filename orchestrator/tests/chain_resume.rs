//! Integration test: a chain that fails partway through is resumable from the failed step
//! without re-running the steps that already succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use orchestrator::llm::mock::MockLlmProvider;
use orchestrator::memory::{Embedder, InMemoryVectorStore};
use orchestrator::repository::{InMemoryAgentRepository, InMemoryChainRepository, InMemoryConversationRepository, InMemoryPromptRepository, InMemoryTaskItemRepository};
use orchestrator::tools::ToolRegistry;
use orchestrator::{Agent, Chain, LLMProvider, OrchestratorError, Orchestrator, PromptType, RequestContext, UserId};
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
async fn chain_failure_mid_run_is_resumable_from_the_failed_step() {
    let owner = UserId("u1".into());
    let provider = Arc::new(MockLlmProvider::fixed("step one result", 10_000));
    let orch = orchestrator_with(provider);
    orch.agents.add(Agent::new(owner.clone(), "assistant")).await.unwrap();

    let mut chain = Chain::new("pipeline");
    chain.add_step("assistant", PromptType::Prompt, "{user_input}");
    chain.add_step("assistant", PromptType::Command, "not valid json");
    orch.chains.add(owner.clone(), chain).await.unwrap();

    let ctx = RequestContext::new(owner.clone());
    let conversation_id = Uuid::new_v4();

    let first_attempt = orch.run_chain(&ctx, "pipeline", "go", 1, None, conversation_id).await.unwrap_err();
    assert!(first_attempt.detail().contains("resume with from_step=2"));

    let stored = orch.chains.get(&owner, "pipeline").await.unwrap().unwrap();
    assert_eq!(stored.latest_response(1).unwrap().content, "step one result");

    let resumed = orch.run_chain(&ctx, "pipeline", "go", 2, None, conversation_id).await.unwrap_err();
    assert!(resumed.detail().contains("resume with from_step=2"));

    let stored_again = orch.chains.get(&owner, "pipeline").await.unwrap().unwrap();
    assert_eq!(stored_again.all_responses(1).len(), 1, "step one was not re-executed by the resumed run");
}
