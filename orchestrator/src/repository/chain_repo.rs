//! Chain CRUD: backs the `chain.{add, rename, delete, list, get, add_step, update_step,
//! move_step, delete_step, get_responses}` surface. Step mutation itself is delegated to
//! [`Chain`]'s own methods; this module only owns identity, ownership, and storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::context::UserId;
use crate::domain::chain::PromptType;
use crate::domain::{Chain, ChainStepResponse};
use crate::error::OrchestratorError;

#[async_trait]
pub trait ChainRepository: Send + Sync {
    async fn add(&self, owner: UserId, chain: Chain) -> Result<(), OrchestratorError>;
    async fn get(&self, owner: &UserId, name: &str) -> Result<Option<Chain>, OrchestratorError>;
    async fn list(&self, owner: &UserId) -> Result<Vec<Chain>, OrchestratorError>;
    async fn rename(&self, owner: &UserId, name: &str, new_name: &str) -> Result<(), OrchestratorError>;
    async fn delete(&self, owner: &UserId, name: &str) -> Result<(), OrchestratorError>;
    async fn add_step(&self, owner: &UserId, name: &str, agent_name: &str, prompt_type: PromptType, payload: &str) -> Result<u32, OrchestratorError>;
    async fn update_step(&self, owner: &UserId, name: &str, step_number: u32, payload: &str) -> Result<(), OrchestratorError>;
    async fn move_step(&self, owner: &UserId, name: &str, old: u32, new: u32) -> Result<(), OrchestratorError>;
    async fn delete_step(&self, owner: &UserId, name: &str, step_number: u32) -> Result<(), OrchestratorError>;
    async fn record_response(&self, owner: &UserId, name: &str, step_number: u32, content: &str, at: DateTime<Utc>) -> Result<(), OrchestratorError>;
    async fn get_responses(&self, owner: &UserId, name: &str, step_number: u32) -> Result<Vec<ChainStepResponse>, OrchestratorError>;
}

#[derive(Default)]
pub struct InMemoryChainRepository {
    chains: DashMap<(UserId, String), Chain>,
}

impl InMemoryChainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(owner: &UserId, name: &str) -> (UserId, String) {
        (owner.clone(), name.to_string())
    }

    fn not_found(name: &str) -> OrchestratorError {
        OrchestratorError::NotFound(format!("chain {name}"))
    }
}

#[async_trait]
impl ChainRepository for InMemoryChainRepository {
    async fn add(&self, owner: UserId, chain: Chain) -> Result<(), OrchestratorError> {
        let key = Self::key(&owner, &chain.name);
        if self.chains.contains_key(&key) {
            return Err(OrchestratorError::InvalidInput(format!("chain {} already exists", chain.name)));
        }
        self.chains.insert(key, chain);
        Ok(())
    }

    async fn get(&self, owner: &UserId, name: &str) -> Result<Option<Chain>, OrchestratorError> {
        Ok(self.chains.get(&Self::key(owner, name)).map(|c| c.clone()))
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<Chain>, OrchestratorError> {
        Ok(self.chains.iter().filter(|e| &e.key().0 == owner).map(|e| e.value().clone()).collect())
    }

    async fn rename(&self, owner: &UserId, name: &str, new_name: &str) -> Result<(), OrchestratorError> {
        let mut chain = self
            .chains
            .remove(&Self::key(owner, name))
            .map(|(_, c)| c)
            .ok_or_else(|| Self::not_found(name))?;
        chain.name = new_name.to_string();
        self.chains.insert(Self::key(owner, new_name), chain);
        Ok(())
    }

    async fn delete(&self, owner: &UserId, name: &str) -> Result<(), OrchestratorError> {
        self.chains
            .remove(&Self::key(owner, name))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn add_step(&self, owner: &UserId, name: &str, agent_name: &str, prompt_type: PromptType, payload: &str) -> Result<u32, OrchestratorError> {
        let mut chain = self.chains.get_mut(&Self::key(owner, name)).ok_or_else(|| Self::not_found(name))?;
        Ok(chain.add_step(agent_name, prompt_type, payload))
    }

    async fn update_step(&self, owner: &UserId, name: &str, step_number: u32, payload: &str) -> Result<(), OrchestratorError> {
        let mut chain = self.chains.get_mut(&Self::key(owner, name)).ok_or_else(|| Self::not_found(name))?;
        chain
            .update_step(step_number, payload)
            .map_err(|e| OrchestratorError::InvalidInput(e.to_string()))
    }

    async fn move_step(&self, owner: &UserId, name: &str, old: u32, new: u32) -> Result<(), OrchestratorError> {
        let mut chain = self.chains.get_mut(&Self::key(owner, name)).ok_or_else(|| Self::not_found(name))?;
        chain.move_step(old, new).map_err(|e| OrchestratorError::InvalidInput(e.to_string()))
    }

    async fn delete_step(&self, owner: &UserId, name: &str, step_number: u32) -> Result<(), OrchestratorError> {
        let mut chain = self.chains.get_mut(&Self::key(owner, name)).ok_or_else(|| Self::not_found(name))?;
        chain.delete_step(step_number).map_err(|e| OrchestratorError::InvalidInput(e.to_string()))
    }

    async fn record_response(&self, owner: &UserId, name: &str, step_number: u32, content: &str, at: DateTime<Utc>) -> Result<(), OrchestratorError> {
        let mut chain = self.chains.get_mut(&Self::key(owner, name)).ok_or_else(|| Self::not_found(name))?;
        chain.record_response(step_number, content, at);
        Ok(())
    }

    async fn get_responses(&self, owner: &UserId, name: &str, step_number: u32) -> Result<Vec<ChainStepResponse>, OrchestratorError> {
        let chain = self.chains.get(&Self::key(owner, name)).ok_or_else(|| Self::not_found(name))?;
        Ok(chain.all_responses(step_number).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId("u1".into())
    }

    #[tokio::test]
    async fn add_step_through_repository_advances_chain() {
        let repo = InMemoryChainRepository::new();
        repo.add(owner(), Chain::new("pipeline")).await.unwrap();
        let n = repo.add_step(&owner(), "pipeline", "a", PromptType::Prompt, "hi").await.unwrap();
        assert_eq!(n, 1);
        let chain = repo.get(&owner(), "pipeline").await.unwrap().unwrap();
        assert_eq!(chain.steps().len(), 1);
    }

    #[tokio::test]
    async fn record_and_fetch_responses_round_trip() {
        let repo = InMemoryChainRepository::new();
        repo.add(owner(), Chain::new("pipeline")).await.unwrap();
        repo.add_step(&owner(), "pipeline", "a", PromptType::Prompt, "hi").await.unwrap();
        repo.record_response(&owner(), "pipeline", 1, "result", Utc::now()).await.unwrap();
        let responses = repo.get_responses(&owner(), "pipeline", 1).await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].content, "result");
    }

    #[tokio::test]
    async fn operations_on_missing_chain_are_not_found() {
        let repo = InMemoryChainRepository::new();
        let err = repo.delete(&owner(), "ghost").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_filters_by_owner() {
        let repo = InMemoryChainRepository::new();
        repo.add(owner(), Chain::new("mine")).await.unwrap();
        repo.add(UserId("u2".into()), Chain::new("theirs")).await.unwrap();
        let mine = repo.list(&owner()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "mine");
    }
}
