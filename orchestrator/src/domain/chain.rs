//! Chain: an ordered, linear sequence of steps of type Prompt, Command, or sub-Chain.
//!
//! `step_number` is a dense 1-based sequence: the set of step numbers always equals
//! `{1..len}`. [`Chain::move_step`] preserves that density by shifting the closed interval
//! between the old and new position by one, inclusive.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptType {
    Prompt,
    Command,
    Chain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStep {
    pub step_number: u32,
    pub agent_name: String,
    pub prompt_type: PromptType,
    /// Template name (Prompt), tool name (Command), or sub-chain name (Chain).
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStepResponse {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Chain {
    pub name: String,
    steps: Vec<ChainStep>,
    /// Every response ever recorded for a step, in recording order; the *latest* one is
    /// what `{STEPn}` substitution reads.
    responses: HashMap<u32, Vec<ChainStepResponse>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainEditError {
    #[error("step {0} not found")]
    StepNotFound(u32),
    #[error("target position {0} out of range 1..={1}")]
    OutOfRange(u32, u32),
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            responses: HashMap::new(),
        }
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Appends a step at the end, assigning the next dense step number.
    pub fn add_step(&mut self, agent_name: impl Into<String>, prompt_type: PromptType, payload: impl Into<String>) -> u32 {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(ChainStep {
            step_number,
            agent_name: agent_name.into(),
            prompt_type,
            payload: payload.into(),
        });
        step_number
    }

    pub fn step(&self, step_number: u32) -> Option<&ChainStep> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    pub fn update_step(&mut self, step_number: u32, payload: impl Into<String>) -> Result<(), ChainEditError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.step_number == step_number)
            .ok_or(ChainEditError::StepNotFound(step_number))?;
        step.payload = payload.into();
        Ok(())
    }

    /// Moves the step at `old` to position `new`, shifting every step in the closed
    /// interval `[min(old,new), max(old,new)]` by ±1 so numbering stays dense.
    /// `move_step(x, x)` is a no-op.
    pub fn move_step(&mut self, old: u32, new: u32) -> Result<(), ChainEditError> {
        let len = self.steps.len() as u32;
        if old == 0 || old > len {
            return Err(ChainEditError::StepNotFound(old));
        }
        if new == 0 || new > len {
            return Err(ChainEditError::OutOfRange(new, len));
        }
        if old == new {
            return Ok(());
        }

        let idx = self.steps.iter().position(|s| s.step_number == old).unwrap();
        let moved = self.steps.remove(idx);
        let insert_at = self.steps.iter().position(|s| s.step_number == new).unwrap_or(self.steps.len());
        let insert_at = if new > old { insert_at + 1 } else { insert_at };
        self.steps.insert(insert_at.min(self.steps.len()), moved);

        for (i, step) in self.steps.iter_mut().enumerate() {
            step.step_number = i as u32 + 1;
        }
        Ok(())
    }

    pub fn delete_step(&mut self, step_number: u32) -> Result<(), ChainEditError> {
        let idx = self
            .steps
            .iter()
            .position(|s| s.step_number == step_number)
            .ok_or(ChainEditError::StepNotFound(step_number))?;
        self.steps.remove(idx);
        self.responses.remove(&step_number);
        for step in &mut self.steps {
            if step.step_number > step_number {
                step.step_number -= 1;
            }
        }
        // Re-key responses above the deleted step.
        let mut shifted = HashMap::new();
        for (num, resp) in self.responses.drain() {
            let new_num = if num > step_number { num - 1 } else { num };
            shifted.insert(new_num, resp);
        }
        self.responses = shifted;
        Ok(())
    }

    pub fn record_response(&mut self, step_number: u32, content: impl Into<String>, at: DateTime<Utc>) {
        self.responses.entry(step_number).or_default().push(ChainStepResponse {
            content: content.into(),
            timestamp: at,
        });
    }

    /// The latest recorded response for `step_number`, used by `{STEPn}` substitution.
    pub fn latest_response(&self, step_number: u32) -> Option<&ChainStepResponse> {
        self.responses.get(&step_number).and_then(|v| v.last())
    }

    pub fn all_responses(&self, step_number: u32) -> &[ChainStepResponse] {
        self.responses.get(&step_number).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Density invariant check: the set of step numbers equals `{1..len}`.
    pub fn is_dense(&self) -> bool {
        let mut numbers: Vec<u32> = self.steps.iter().map(|s| s.step_number).collect();
        numbers.sort_unstable();
        numbers == (1..=self.steps.len() as u32).collect::<Vec<_>>()
    }
}
