//! Prompt CRUD: backs the `prompt.{add, get, list, rename, delete, update}` surface.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::context::UserId;
use crate::domain::{Prompt, PromptKey};
use crate::error::OrchestratorError;

#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn add(&self, prompt: Prompt) -> Result<(), OrchestratorError>;
    async fn get(&self, key: &PromptKey) -> Result<Option<Prompt>, OrchestratorError>;
    async fn list(&self, user: &UserId, category: Option<&str>) -> Result<Vec<Prompt>, OrchestratorError>;
    async fn rename(&self, key: &PromptKey, new_name: &str) -> Result<(), OrchestratorError>;
    async fn update(&self, key: &PromptKey, new_body: &str) -> Result<(), OrchestratorError>;
    async fn delete(&self, key: &PromptKey) -> Result<(), OrchestratorError>;
}

#[derive(Default)]
pub struct InMemoryPromptRepository {
    prompts: DashMap<PromptKey, Prompt>,
}

impl InMemoryPromptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptRepository for InMemoryPromptRepository {
    async fn add(&self, prompt: Prompt) -> Result<(), OrchestratorError> {
        if self.prompts.contains_key(&prompt.key) {
            return Err(OrchestratorError::InvalidInput(format!(
                "prompt {}/{} already exists for this user",
                prompt.key.category, prompt.key.name
            )));
        }
        self.prompts.insert(prompt.key.clone(), prompt);
        Ok(())
    }

    async fn get(&self, key: &PromptKey) -> Result<Option<Prompt>, OrchestratorError> {
        Ok(self.prompts.get(key).map(|p| p.clone()))
    }

    async fn list(&self, user: &UserId, category: Option<&str>) -> Result<Vec<Prompt>, OrchestratorError> {
        Ok(self
            .prompts
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| &p.key.user_id == user)
            .filter(|p| category.map_or(true, |c| p.key.category == c))
            .collect())
    }

    async fn rename(&self, key: &PromptKey, new_name: &str) -> Result<(), OrchestratorError> {
        let mut prompt = self
            .prompts
            .remove(key)
            .map(|(_, p)| p)
            .ok_or_else(|| OrchestratorError::NotFound(format!("prompt {}/{}", key.category, key.name)))?;
        prompt.rename(new_name);
        self.prompts.insert(prompt.key.clone(), prompt);
        Ok(())
    }

    async fn update(&self, key: &PromptKey, new_body: &str) -> Result<(), OrchestratorError> {
        let mut prompt = self
            .prompts
            .get_mut(key)
            .ok_or_else(|| OrchestratorError::NotFound(format!("prompt {}/{}", key.category, key.name)))?;
        prompt.body = new_body.to_string();
        Ok(())
    }

    async fn delete(&self, key: &PromptKey) -> Result<(), OrchestratorError> {
        self.prompts
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| OrchestratorError::NotFound(format!("prompt {}/{}", key.category, key.name)))
    }
}
