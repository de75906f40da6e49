//! Background sweep that drives deferred `TaskItem`s across all users.
//!
//! One sweep: pull everything due, run each under an impersonation credential scoped to
//! its owner, and either mark it completed or delete it if the handler raised (poison
//! tasks do not get to loop forever).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::domain::TaskItem;
use crate::error::OrchestratorError;
use crate::repository::{ConversationRepository, TaskItemRepository};
use crate::task_engine::TaskEngine;

const SWEEP_PERIOD: Duration = Duration::from_secs(60);
const CHUNK_SIZE: usize = 5;
const IMPERSONATION_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims carried by a minted impersonation credential, scoped to one `TaskItem`'s owner.
#[derive(Debug, Serialize, Deserialize)]
struct ImpersonationClaims {
    sub: String,
    email: String,
    exp: i64,
}

/// Drives the 60-second sweep described for the background task pipeline.
pub struct TaskMonitor {
    items: Arc<dyn TaskItemRepository>,
    tasks: Arc<TaskEngine>,
    conversations: Arc<dyn ConversationRepository>,
    signing_key: Vec<u8>,
    sweep_lock: Arc<tokio::sync::Mutex<()>>,
    cancel: CancellationToken,
}

impl TaskMonitor {
    pub fn new(
        items: Arc<dyn TaskItemRepository>,
        tasks: Arc<TaskEngine>,
        conversations: Arc<dyn ConversationRepository>,
        signing_key: Vec<u8>,
    ) -> Self {
        Self {
            items,
            tasks,
            conversations,
            signing_key,
            sweep_lock: Arc::new(tokio::sync::Mutex::new(())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs sweeps on a 60 second cadence until cancelled. Cooperative shutdown: the
    /// in-flight sweep (if any) is allowed to drain before this returns.
    pub async fn run_forever(&self) {
        loop {
            self.sweep_once().await;
            tokio::select! {
                _ = tokio::time::sleep(SWEEP_PERIOD) => {}
                _ = self.cancel.cancelled() => return,
            }
            if self.cancel.is_cancelled() {
                return;
            }
        }
    }

    /// One sweep. Skips entirely (rather than blocking) if another sweep is already in
    /// flight on this process — the non-reentrant lock the operating loop calls for.
    pub async fn sweep_once(&self) {
        let Ok(_guard) = self.sweep_lock.clone().try_lock_owned() else {
            tracing::debug!("skipping sweep: one is already in flight");
            return;
        };

        let eligible = match self.items.eligible(Utc::now()).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load eligible task items");
                return;
            }
        };

        for chunk in eligible.chunks(CHUNK_SIZE) {
            if self.cancel.is_cancelled() {
                return;
            }
            let outcomes = futures::future::join_all(chunk.iter().cloned().map(|item| {
                let child = self.cancel.child_token();
                async move { (item.id, self.handle_one(item, child).await) }
            }))
            .await;

            for (id, outcome) in outcomes {
                match outcome {
                    Ok(()) => {
                        if let Err(e) = self.items.mark_completed(id).await {
                            tracing::warn!(task_item = %id, error = %e, "failed to mark task item completed");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(task_item = %id, error = %e, "task handler failed; deleting to avoid a poison loop");
                        if let Err(e) = self.items.delete(id).await {
                            tracing::warn!(task_item = %id, error = %e, "failed to delete poisoned task item");
                        }
                    }
                }
            }
        }
    }

    async fn handle_one(&self, item: TaskItem, cancel: CancellationToken) -> Result<(), OrchestratorError> {
        let agent_name = item
            .payload
            .get("agent")
            .and_then(|v| v.as_str())
            .ok_or_else(|| OrchestratorError::InvalidInput(format!("task item {} payload is missing an \"agent\" field", item.id)))?
            .to_string();

        let _credential = self.mint_impersonation_token(&item)?;

        let conversation_id = self.conversations.create(item.user_id.clone()).await?;
        let ctx = RequestContext::with_cancellation(item.user_id.clone(), cancel);
        let mut stream = self.tasks.run(ctx, item.user_id.clone(), agent_name, item.objective.clone(), false, conversation_id);
        while stream.next().await.is_some() {}
        Ok(())
    }

    /// Mints a short-lived bearer token scoping a background run to `item`'s owner.
    /// `email` falls back to the raw user id when the item carries no separate address.
    fn mint_impersonation_token(&self, item: &TaskItem) -> Result<String, OrchestratorError> {
        let email = item.payload.get("email").and_then(|v| v.as_str()).unwrap_or(&item.user_id.0).to_string();
        let claims = ImpersonationClaims {
            sub: item.user_id.0.clone(),
            email,
            exp: (Utc::now() + chrono::Duration::seconds(IMPERSONATION_TTL_SECS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(&self.signing_key))
            .map_err(|e| OrchestratorError::UpstreamFailure(format!("failed to mint impersonation token: {e}")))
    }
}

/// A single chunk partition, exposed for tests that need to assert on batching without
/// spinning up a full sweep.
pub fn chunk_ids(ids: &[Uuid]) -> Vec<&[Uuid]> {
    ids.chunks(CHUNK_SIZE).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserId;
    use crate::domain::{Agent, Prompt};
    use crate::interaction::InteractionLoop;
    use crate::llm::driver::InferenceDriver;
    use crate::llm::mock::MockLlmProvider;
    use crate::llm::provider::LLMProvider;
    use crate::memory::{Embedder, InMemoryVectorStore, MemoryStore};
    use crate::prompt::composer::PromptComposer;
    use crate::repository::{AgentRepository, InMemoryAgentRepository, InMemoryConversationRepository, InMemoryPromptRepository, InMemoryTaskItemRepository, PromptRepository};
    use crate::tools::registry::ToolRegistry;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

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

    async fn setup(provider: Arc<dyn LLMProvider>) -> (TaskMonitor, Arc<InMemoryTaskItemRepository>) {
        let memory = Arc::new(MemoryStore::new(Arc::new(MockEmbedder), Arc::new(InMemoryVectorStore::new())));
        let tools = Arc::new(ToolRegistry::new());
        let composer = Arc::new(PromptComposer::new(memory.clone(), tools.clone(), Arc::new(MockEmbedder)));
        let driver = Arc::new(InferenceDriver::new(provider));
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let interaction = Arc::new(InteractionLoop::new(composer, driver, tools, memory, conversations.clone()));

        let agents = Arc::new(InMemoryAgentRepository::new());
        agents.add(Agent::new(owner(), "assistant")).await.unwrap();

        let prompts = Arc::new(InMemoryPromptRepository::new());
        prompts.add(Prompt::new("task", "execute", owner(), "{user_input}")).await.unwrap();
        prompts.add(Prompt::new("task", "task", owner(), "no more tasks")).await.unwrap();
        prompts.add(Prompt::new("task", "priority", owner(), "{task_names}")).await.unwrap();

        let tasks = Arc::new(TaskEngine::new(prompts, agents, interaction));
        let items = Arc::new(InMemoryTaskItemRepository::new());
        let monitor = TaskMonitor::new(items.clone(), tasks, conversations, b"test-signing-key".to_vec());
        (monitor, items)
    }

    #[tokio::test]
    async fn sweep_completes_an_eligible_item_and_leaves_future_items_alone() {
        let provider = Arc::new(MockLlmProvider::sequence(vec!["did it".to_string(), "None".to_string(), "None".to_string()]));
        let (monitor, items) = setup(provider).await;

        let due = TaskItem::new(owner(), "summarize inbox", Utc::now() - ChronoDuration::seconds(5), json!({"agent": "assistant"}));
        let due_id = due.id;
        let future = TaskItem::new(owner(), "later", Utc::now() + ChronoDuration::hours(1), json!({"agent": "assistant"}));
        let future_id = future.id;
        items.add(due).await.unwrap();
        items.add(future).await.unwrap();

        monitor.sweep_once().await;

        assert!(items.get(due_id).await.unwrap().unwrap().completed);
        assert!(!items.get(future_id).await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn handler_missing_agent_field_deletes_the_poison_item() {
        let provider = Arc::new(MockLlmProvider::fixed("unused", 10_000));
        let (monitor, items) = setup(provider).await;

        let poison = TaskItem::new(owner(), "no agent here", Utc::now() - ChronoDuration::seconds(5), json!({}));
        let poison_id = poison.id;
        items.add(poison).await.unwrap();

        monitor.sweep_once().await;

        assert!(items.get(poison_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mint_impersonation_token_embeds_subject_and_expiry() {
        let provider = Arc::new(MockLlmProvider::fixed("unused", 10_000));
        let (monitor, _items) = setup(provider).await;
        let item = TaskItem::new(owner(), "obj", Utc::now(), json!({"email": "u1@example.com"}));
        let token = monitor.mint_impersonation_token(&item).unwrap();
        assert!(!token.is_empty());
        assert_eq!(token.split('.').count(), 3);
    }
}
