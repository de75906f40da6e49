//! Agent: a named LLM configuration owned by a user, with tools and a memory.
//!
//! Identity is `(owner_user_id, agent_name)`; settings are mutated by the owner only
//! (enforced by callers via [`crate::error::OrchestratorError::PermissionDenied`], not by
//! this type itself — the domain type stays a plain data holder).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::UserId;

/// Provider selections and knobs for one agent. Concrete adapters are resolved elsewhere
/// by capability (see `provider-spec::ProviderCapabilities`); this struct only records
/// *which* provider/model an agent picked, not how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    pub llm_provider_id: String,
    pub llm_model_id: String,
    pub embedder_provider_id: String,
    pub context_results: usize,
    pub max_output_floor: u32,
    pub safety_margin: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            llm_provider_id: "mock".to_string(),
            llm_model_id: "mock-1".to_string(),
            embedder_provider_id: "mock".to_string(),
            context_results: 4,
            max_output_floor: 256,
            safety_margin: 512,
        }
    }
}

/// Whether a background job (a task-engine run, a task-monitor sweep) currently owns
/// this agent. Callers check this before deleting an agent so a run in flight doesn't
/// lose its configuration out from under it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    #[default]
    Idle,
    Busy,
}

/// A named LLM configuration owned by a user.
///
/// `(owner, name)` is the stable identity; everything else is mutable by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub owner: UserId,
    pub name: String,
    pub settings: AgentSettings,
    /// Tool name -> enabled flag.
    pub commands: HashMap<String, bool>,
    pub status: AgentStatus,
}

impl Agent {
    pub fn new(owner: UserId, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            settings: AgentSettings::default(),
            commands: HashMap::new(),
            status: AgentStatus::Idle,
        }
    }

    /// True when `caller` may mutate this agent's settings or commands.
    pub fn is_owned_by(&self, caller: &UserId) -> bool {
        &self.owner == caller
    }

    /// Tool names this agent has enabled, in no particular order.
    pub fn enabled_command_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn set_command_enabled(&mut self, tool_name: impl Into<String>, enabled: bool) {
        self.commands.insert(tool_name.into(), enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_has_no_enabled_commands() {
        let agent = Agent::new(UserId("u1".into()), "researcher");
        assert!(agent.enabled_command_names().is_empty());
    }

    #[test]
    fn is_owned_by_checks_owner_identity() {
        let agent = Agent::new(UserId("u1".into()), "researcher");
        assert!(agent.is_owned_by(&UserId("u1".into())));
        assert!(!agent.is_owned_by(&UserId("u2".into())));
    }

    #[test]
    fn set_command_enabled_updates_enabled_names() {
        let mut agent = Agent::new(UserId("u1".into()), "researcher");
        agent.set_command_enabled("search", true);
        agent.set_command_enabled("delete_everything", false);
        assert_eq!(agent.enabled_command_names(), vec!["search"]);
    }
}
