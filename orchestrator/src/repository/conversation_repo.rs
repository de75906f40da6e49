//! Conversation CRUD: persistence for the Interaction Loop's Persisting state and for
//! `conversation.fork_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::context::UserId;
use crate::domain::{Conversation, Message, Role};
use crate::error::OrchestratorError;

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create(&self, owner: UserId) -> Result<Uuid, OrchestratorError>;
    async fn get(&self, id: Uuid) -> Result<Option<Conversation>, OrchestratorError>;
    async fn list(&self, owner: &UserId) -> Result<Vec<Conversation>, OrchestratorError>;
    async fn append(&self, id: Uuid, role: Role, content: &str, at: DateTime<Utc>) -> Result<Message, OrchestratorError>;
    async fn fork_at(&self, id: Uuid, message_id: Uuid, new_owner: UserId) -> Result<Uuid, OrchestratorError>;
    async fn delete(&self, id: Uuid) -> Result<(), OrchestratorError>;
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: DashMap<Uuid, Conversation>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(id: Uuid) -> OrchestratorError {
        OrchestratorError::NotFound(format!("conversation {id}"))
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, owner: UserId) -> Result<Uuid, OrchestratorError> {
        let convo = Conversation::new(owner);
        let id = convo.id;
        self.conversations.insert(id, convo);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conversation>, OrchestratorError> {
        Ok(self.conversations.get(&id).map(|c| c.clone()))
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<Conversation>, OrchestratorError> {
        Ok(self
            .conversations
            .iter()
            .filter(|e| &e.value().owner == owner)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn append(&self, id: Uuid, role: Role, content: &str, at: DateTime<Utc>) -> Result<Message, OrchestratorError> {
        let mut convo = self.conversations.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        let message = convo
            .append(role, content, at)
            .map_err(|e| OrchestratorError::InvalidInput(e.to_string()))?
            .clone();
        Ok(message)
    }

    async fn fork_at(&self, id: Uuid, message_id: Uuid, new_owner: UserId) -> Result<Uuid, OrchestratorError> {
        let convo = self.conversations.get(&id).ok_or_else(|| Self::not_found(id))?;
        let forked = convo
            .fork_at(message_id, new_owner)
            .ok_or_else(|| OrchestratorError::NotFound(format!("message {message_id}")))?;
        let forked_id = forked.id;
        drop(convo);
        self.conversations.insert(forked_id, forked);
        Ok(forked_id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), OrchestratorError> {
        self.conversations.remove(&id).map(|_| ()).ok_or_else(|| Self::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId("u1".into())
    }

    #[tokio::test]
    async fn create_then_append_round_trips() {
        let repo = InMemoryConversationRepository::new();
        let id = repo.create(owner()).await.unwrap();
        repo.append(id, Role::User, "hi", Utc::now()).await.unwrap();
        let convo = repo.get(id).await.unwrap().unwrap();
        assert_eq!(convo.messages().len(), 1);
    }

    #[tokio::test]
    async fn fork_at_creates_independent_conversation() {
        let repo = InMemoryConversationRepository::new();
        let id = repo.create(owner()).await.unwrap();
        let msg = repo.append(id, Role::User, "hi", Utc::now()).await.unwrap();
        repo.append(id, Role::Assistant, "hello", Utc::now()).await.unwrap();

        let forked_id = repo.fork_at(id, msg.id, UserId("u2".into())).await.unwrap();
        let forked = repo.get(forked_id).await.unwrap().unwrap();
        assert_eq!(forked.messages().len(), 1);

        let original = repo.get(id).await.unwrap().unwrap();
        assert_eq!(original.messages().len(), 2);
    }

    #[tokio::test]
    async fn delete_missing_conversation_is_not_found() {
        let repo = InMemoryConversationRepository::new();
        let err = repo.delete(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
