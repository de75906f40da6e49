//! Vector storage port: the abstract collection-scoped record store the Memory Store
//! drives. Concrete adapters (a vector database, a relational table with a vector
//! extension) implement this trait; [`crate::memory::in_memory_vector_store`] is the
//! only adapter that ships here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrchestratorError;

/// Collection 0 is an agent's durable memory; a conversation-keyed collection is
/// ephemeral to that chat and is wiped when the conversation is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionId {
    Numbered(u64),
    Conversation(Uuid),
}

impl CollectionId {
    pub const DURABLE: CollectionId = CollectionId::Numbered(0);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub collection: CollectionId,
    pub text: String,
    pub embedding: Vec<f32>,
    pub description: Option<String>,
    pub external_source: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, record: MemoryRecord) -> Result<(), OrchestratorError>;

    /// Every record currently in `collection`, dimension and all. Used for keyword
    /// scoring and export; adapters backed by a true ANN index may still need to
    /// materialize this for small collections.
    async fn all(&self, collection: &CollectionId) -> Result<Vec<MemoryRecord>, OrchestratorError>;

    async fn delete(&self, collection: &CollectionId, id: &str) -> Result<(), OrchestratorError>;

    async fn delete_by_source(&self, collection: &CollectionId, source: &str) -> Result<(), OrchestratorError>;

    async fn wipe(&self, collection: &CollectionId) -> Result<(), OrchestratorError>;
}
