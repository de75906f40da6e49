//! Pure in-memory [`VectorStore`] adapter. Not persistent; data is lost when dropped.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::OrchestratorError;
use crate::memory::vector_store::{CollectionId, MemoryRecord, VectorStore};

#[derive(Default)]
pub struct InMemoryVectorStore {
    data: DashMap<CollectionId, Vec<MemoryRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, record: MemoryRecord) -> Result<(), OrchestratorError> {
        let mut bucket = self.data.entry(record.collection.clone()).or_default();
        if let Some(existing) = bucket.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            bucket.push(record);
        }
        Ok(())
    }

    async fn all(&self, collection: &CollectionId) -> Result<Vec<MemoryRecord>, OrchestratorError> {
        Ok(self.data.get(collection).map(|b| b.clone()).unwrap_or_default())
    }

    async fn delete(&self, collection: &CollectionId, id: &str) -> Result<(), OrchestratorError> {
        if let Some(mut bucket) = self.data.get_mut(collection) {
            bucket.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn delete_by_source(&self, collection: &CollectionId, source: &str) -> Result<(), OrchestratorError> {
        if let Some(mut bucket) = self.data.get_mut(collection) {
            bucket.retain(|r| r.external_source.as_deref() != Some(source));
        }
        Ok(())
    }

    async fn wipe(&self, collection: &CollectionId) -> Result<(), OrchestratorError> {
        self.data.remove(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, collection: CollectionId, source: Option<&str>) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            collection,
            text: "hello".into(),
            embedding: vec![1.0, 0.0],
            description: None,
            external_source: source.map(String::from),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_then_all_returns_record() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("r1", CollectionId::DURABLE, None)).await.unwrap();
        let all = store.all(&CollectionId::DURABLE).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn upsert_same_id_replaces() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("r1", CollectionId::DURABLE, None)).await.unwrap();
        let mut updated = record("r1", CollectionId::DURABLE, None);
        updated.text = "updated".into();
        store.upsert(updated).await.unwrap();
        let all = store.all(&CollectionId::DURABLE).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "updated");
    }

    #[tokio::test]
    async fn delete_by_source_removes_matching_records() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("r1", CollectionId::DURABLE, Some("doc.txt"))).await.unwrap();
        store.upsert(record("r2", CollectionId::DURABLE, Some("other.txt"))).await.unwrap();
        store.delete_by_source(&CollectionId::DURABLE, "doc.txt").await.unwrap();
        let all = store.all(&CollectionId::DURABLE).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "r2");
    }

    #[tokio::test]
    async fn wipe_empties_collection() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("r1", CollectionId::DURABLE, None)).await.unwrap();
        store.wipe(&CollectionId::DURABLE).await.unwrap();
        assert!(store.all(&CollectionId::DURABLE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn absent_collection_returns_empty() {
        let store = InMemoryVectorStore::new();
        assert!(store.all(&CollectionId::DURABLE).await.unwrap().is_empty());
    }
}
