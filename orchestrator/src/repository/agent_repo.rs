//! Agent CRUD: backs the `agent.{add, rename, update_settings, update_commands, delete,
//! list, get_config}` surface.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::context::UserId;
use crate::domain::{Agent, AgentSettings, AgentStatus};
use crate::error::OrchestratorError;

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn add(&self, agent: Agent) -> Result<(), OrchestratorError>;
    async fn get(&self, owner: &UserId, name: &str) -> Result<Option<Agent>, OrchestratorError>;
    async fn list(&self, owner: &UserId) -> Result<Vec<Agent>, OrchestratorError>;
    async fn rename(&self, owner: &UserId, name: &str, new_name: &str) -> Result<(), OrchestratorError>;
    async fn update_settings(&self, owner: &UserId, name: &str, settings: AgentSettings) -> Result<(), OrchestratorError>;
    async fn update_commands(&self, owner: &UserId, name: &str, tool_name: &str, enabled: bool) -> Result<(), OrchestratorError>;
    async fn delete(&self, owner: &UserId, name: &str) -> Result<(), OrchestratorError>;
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: DashMap<(UserId, String), Agent>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(owner: &UserId, name: &str) -> (UserId, String) {
        (owner.clone(), name.to_string())
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn add(&self, agent: Agent) -> Result<(), OrchestratorError> {
        let key = Self::key(&agent.owner, &agent.name);
        if self.agents.contains_key(&key) {
            return Err(OrchestratorError::InvalidInput(format!("agent {} already exists", agent.name)));
        }
        self.agents.insert(key, agent);
        Ok(())
    }

    async fn get(&self, owner: &UserId, name: &str) -> Result<Option<Agent>, OrchestratorError> {
        Ok(self.agents.get(&Self::key(owner, name)).map(|a| a.clone()))
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<Agent>, OrchestratorError> {
        Ok(self.agents.iter().filter(|e| &e.key().0 == owner).map(|e| e.value().clone()).collect())
    }

    async fn rename(&self, owner: &UserId, name: &str, new_name: &str) -> Result<(), OrchestratorError> {
        let mut agent = self
            .agents
            .remove(&Self::key(owner, name))
            .map(|(_, a)| a)
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {name}")))?;
        agent.name = new_name.to_string();
        self.agents.insert(Self::key(owner, new_name), agent);
        Ok(())
    }

    async fn update_settings(&self, owner: &UserId, name: &str, settings: AgentSettings) -> Result<(), OrchestratorError> {
        let mut agent = self
            .agents
            .get_mut(&Self::key(owner, name))
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {name}")))?;
        if agent.status == AgentStatus::Busy {
            return Err(OrchestratorError::PermissionDenied(format!(
                "agent {name} is referenced by an active run and cannot be reconfigured"
            )));
        }
        agent.settings = settings;
        Ok(())
    }

    async fn update_commands(&self, owner: &UserId, name: &str, tool_name: &str, enabled: bool) -> Result<(), OrchestratorError> {
        let mut agent = self
            .agents
            .get_mut(&Self::key(owner, name))
            .ok_or_else(|| OrchestratorError::NotFound(format!("agent {name}")))?;
        agent.set_command_enabled(tool_name, enabled);
        Ok(())
    }

    async fn delete(&self, owner: &UserId, name: &str) -> Result<(), OrchestratorError> {
        let key = Self::key(owner, name);
        let agent = self.agents.get(&key).ok_or_else(|| OrchestratorError::NotFound(format!("agent {name}")))?;
        if agent.status == AgentStatus::Busy {
            return Err(OrchestratorError::PermissionDenied(format!(
                "agent {name} is referenced by an active task run"
            )));
        }
        drop(agent);
        self.agents.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId("u1".into())
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let repo = InMemoryAgentRepository::new();
        repo.add(Agent::new(owner(), "researcher")).await.unwrap();
        let fetched = repo.get(&owner(), "researcher").await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn delete_busy_agent_is_permission_denied() {
        let repo = InMemoryAgentRepository::new();
        let mut agent = Agent::new(owner(), "researcher");
        agent.status = AgentStatus::Busy;
        repo.add(agent).await.unwrap();
        let err = repo.delete(&owner(), "researcher").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn update_commands_enables_a_tool() {
        let repo = InMemoryAgentRepository::new();
        repo.add(Agent::new(owner(), "researcher")).await.unwrap();
        repo.update_commands(&owner(), "researcher", "echo", true).await.unwrap();
        let agent = repo.get(&owner(), "researcher").await.unwrap().unwrap();
        assert_eq!(agent.enabled_command_names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn rename_is_idempotent_round_trip() {
        let repo = InMemoryAgentRepository::new();
        repo.add(Agent::new(owner(), "a")).await.unwrap();
        repo.rename(&owner(), "a", "b").await.unwrap();
        repo.rename(&owner(), "b", "a").await.unwrap();
        assert!(repo.get(&owner(), "a").await.unwrap().is_some());
    }
}
