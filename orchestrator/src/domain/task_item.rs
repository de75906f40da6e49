//! TaskItem: a scheduled piece of work a user queued for the Task Monitor to pick up.
//!
//! Distinct from the Task Engine's in-memory objective queue: a `TaskItem` is durable,
//! user-visible, and dispatched from a background sweep rather than driven inline by a
//! caller waiting on the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: Uuid,
    pub user_id: UserId,
    pub due_date: DateTime<Utc>,
    pub scheduled: bool,
    pub completed: bool,
    pub objective: String,
    /// Opaque payload carried through to the handler invoked for this item (e.g. the
    /// agent name to run the objective under, or tool-specific arguments).
    pub payload: serde_json::Value,
}

impl TaskItem {
    pub fn new(user_id: UserId, objective: impl Into<String>, due_date: DateTime<Utc>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            due_date,
            scheduled: true,
            completed: false,
            objective: objective.into(),
            payload,
        }
    }

    /// Eligible for the next sweep: scheduled, not yet completed, and due.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.scheduled && !self.completed && self.due_date <= now
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }
}
