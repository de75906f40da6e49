//! Conversation: an ordered, append-only sequence of messages between a user and an agent.
//!
//! Invariant: for successive committed messages `m_i`, `m_{i+1}`, `m_i.timestamp <=
//! m_{i+1}.timestamp` and `m_i.id != m_{i+1}.id`. [`Conversation::append`] is the only
//! way to add a message and it is the sole enforcement point for that invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
    /// Non-dialogue activity: a tool call, a chain step, a task iteration. Kept in the
    /// same append-only log so a transcript can show the full story of a turn.
    Activity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<UserId>,
    pub feedback_received: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp,
            updated_at: None,
            updated_by: None,
            feedback_received: false,
        }
    }

    /// Marks an edit: sets `updated_at`/`updated_by`, keeps `id` unchanged so a transcript
    /// can still cite the original message position after its text is corrected.
    pub fn edit(&mut self, new_content: impl Into<String>, editor: UserId, at: DateTime<Utc>) {
        self.content = new_content.into();
        self.updated_at = Some(at);
        self.updated_by = Some(editor);
    }
}

/// Append-only conversation log, scoped to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner: UserId,
    messages: Vec<Message>,
}

/// Returned by [`Conversation::append`] when the caller supplies a timestamp older than
/// the last committed message's.
#[derive(Debug, thiserror::Error)]
#[error("message timestamp {attempted} is before last committed timestamp {last}")]
pub struct NonMonotonicTimestamp {
    pub attempted: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

impl Conversation {
    pub fn new(owner: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Appends a message at `at`, rejecting a timestamp older than the last committed one.
    /// `at` is supplied by the caller (rather than read from the system clock here) so the
    /// ordering invariant can be driven deterministically in tests.
    pub fn append(
        &mut self,
        role: Role,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<&Message, NonMonotonicTimestamp> {
        if let Some(last) = self.messages.last() {
            if at < last.timestamp {
                return Err(NonMonotonicTimestamp {
                    attempted: at,
                    last: last.timestamp,
                });
            }
        }
        self.messages.push(Message::new(role, content, at));
        Ok(self.messages.last().expect("just pushed"))
    }

    /// Forks this conversation at `message_id`: the new conversation's history is the
    /// prefix up to and including that message. Returns `None` if the id is absent.
    pub fn fork_at(&self, message_id: Uuid, new_owner: UserId) -> Option<Conversation> {
        let cut = self.messages.iter().position(|m| m.id == message_id)?;
        Some(Conversation {
            id: Uuid::new_v4(),
            owner: new_owner,
            messages: self.messages[..=cut].to_vec(),
        })
    }
}
