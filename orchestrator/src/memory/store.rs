//! Memory Store: chunks text, embeds it, and answers similarity + keyword queries
//! against a per-agent collection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::OrchestratorError;
use crate::memory::chunk::chunk_text;
use crate::memory::embedder::Embedder;
use crate::memory::vector_store::{CollectionId, MemoryRecord, VectorStore};

pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

/// One ranked hit from [`MemoryStore::query`].
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub vector_score: f32,
    pub keyword_score: f32,
}

/// A collection's full record set, for [`MemoryStore::export`]/[`MemoryStore::import`].
pub struct CollectionSnapshot {
    pub collection: CollectionId,
    pub records: Vec<MemoryRecord>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Splits `text` into overlapping chunks, embeds each, and upserts one record per
    /// chunk. Record ids are `hash(text‖timestamp)`, so re-ingesting identical text at a
    /// new timestamp produces a new record rather than silently overwriting — callers
    /// who want idempotence should `delete_by_source` first.
    pub async fn write_text(
        &self,
        collection: CollectionId,
        text: &str,
        source: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), OrchestratorError> {
        let chunks = chunk_text(text, self.embedder.chunk_size());
        if chunks.is_empty() {
            return Ok(());
        }

        let refs: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        let vectors = self.embedder.embed(&refs).await?;
        if vectors.len() != chunks.len() {
            return Err(OrchestratorError::UpstreamFailure(
                "embedder returned a different number of vectors than chunks".into(),
            ));
        }

        let now = Utc::now();
        for (chunk, embedding) in chunks.into_iter().zip(vectors.into_iter()) {
            let id = record_id(&chunk, now);
            self.store
                .upsert(MemoryRecord {
                    id,
                    collection: collection.clone(),
                    text: chunk,
                    embedding,
                    description: description.map(String::from),
                    external_source: source.map(String::from),
                    timestamp: now,
                })
                .await?;
        }
        Ok(())
    }

    /// Top-`k` records by `(vector_score, keyword_score)` lexicographic rank, filtered to
    /// `vector_score >= min_score`, ties broken by more-recent timestamp. An absent or
    /// empty collection returns an empty list, not an error.
    pub async fn query(
        &self,
        collection: &CollectionId,
        query_text: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredRecord>, OrchestratorError> {
        let records = self.store.all(collection).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let query_vectors = self.embedder.embed(&[query_text]).await?;
        let query_vector = query_vectors
            .into_iter()
            .next()
            .ok_or_else(|| OrchestratorError::UpstreamFailure("embedder returned no vector for query".into()))?;
        let query_tokens = keyword_tokens(query_text);

        let mut scored: Vec<ScoredRecord> = records
            .into_iter()
            .map(|record| {
                let vector_score = cosine_similarity(&query_vector, &record.embedding);
                let keyword_score = keyword_overlap(&query_tokens, &record.text);
                ScoredRecord {
                    record,
                    vector_score,
                    keyword_score,
                }
            })
            .filter(|s| s.vector_score >= min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.keyword_score.partial_cmp(&a.keyword_score).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.record.timestamp.cmp(&a.record.timestamp))
        });
        scored.truncate(k);
        Ok(scored)
    }

    pub async fn delete(&self, collection: &CollectionId, id: &str) -> Result<(), OrchestratorError> {
        self.store.delete(collection, id).await
    }

    pub async fn delete_by_source(&self, collection: &CollectionId, source: &str) -> Result<(), OrchestratorError> {
        self.store.delete_by_source(collection, source).await
    }

    pub async fn wipe(&self, collection: &CollectionId) -> Result<(), OrchestratorError> {
        self.store.wipe(collection).await
    }

    pub async fn export(&self, collections: &[CollectionId]) -> Result<Vec<CollectionSnapshot>, OrchestratorError> {
        let mut out = Vec::with_capacity(collections.len());
        for collection in collections {
            let records = self.store.all(collection).await?;
            out.push(CollectionSnapshot {
                collection: collection.clone(),
                records,
            });
        }
        Ok(out)
    }

    /// Imports snapshots atomically per collection: a dimension mismatch against this
    /// store's embedder aborts that collection's import entirely (no partial write) and
    /// is reported as the first error; collections before it in the list have already
    /// been committed.
    pub async fn import(&self, snapshots: Vec<CollectionSnapshot>) -> Result<(), OrchestratorError> {
        let dim = self.embedder.dim();
        for snapshot in snapshots {
            for record in &snapshot.records {
                if record.embedding.len() != dim {
                    return Err(OrchestratorError::InvalidInput(format!(
                        "import into collection with dimension {} rejected record of dimension {}",
                        dim,
                        record.embedding.len()
                    )));
                }
            }
            for record in snapshot.records {
                self.store.upsert(record).await?;
            }
        }
        Ok(())
    }
}

fn record_id(text: &str, timestamp: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Lowercased whitespace tokens of at least 3 characters, as a rough proxy for the
/// noun/proper-noun/verb tokens a real tokenizer would extract.
fn keyword_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() >= 3)
        .collect()
}

fn keyword_overlap(query_tokens: &[String], candidate: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let candidate_tokens = keyword_tokens(candidate);
    let hits = query_tokens.iter().filter(|t| candidate_tokens.contains(t)).count();
    hits as f32 / query_tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::in_memory_vector_store::InMemoryVectorStore;
    use async_trait::async_trait;

    struct MockEmbedder {
        dim: usize,
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, OrchestratorError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0f32; self.dim];
                    for (i, b) in t.bytes().enumerate() {
                        v[i % self.dim] += b as f32 / 256.0;
                    }
                    v
                })
                .collect())
        }

        fn dim(&self) -> usize {
            self.dim
        }
    }

    fn make_store() -> MemoryStore {
        MemoryStore::new(Arc::new(MockEmbedder { dim: 16 }), Arc::new(InMemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn write_then_query_finds_semantically_similar_chunk() {
        let store = make_store();
        store
            .write_text(CollectionId::DURABLE, "Rust is a systems programming language.", None, None)
            .await
            .unwrap();
        store
            .write_text(CollectionId::DURABLE, "Bananas are a good source of potassium.", None, None)
            .await
            .unwrap();

        let hits = store.query(&CollectionId::DURABLE, "Rust programming", 5, 0.0).await.unwrap();
        assert!(!hits.is_empty());
        assert!(hits[0].record.text.contains("Rust"));
    }

    #[tokio::test]
    async fn query_against_empty_collection_returns_empty_not_error() {
        let store = make_store();
        let hits = store.query(&CollectionId::DURABLE, "anything", 5, 0.0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn min_score_filters_out_low_similarity_hits() {
        let store = make_store();
        store.write_text(CollectionId::DURABLE, "alpha beta gamma.", None, None).await.unwrap();
        let hits = store.query(&CollectionId::DURABLE, "alpha beta gamma", 5, 1.1).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_by_source_removes_ingested_chunks() {
        let store = make_store();
        store
            .write_text(CollectionId::DURABLE, "Some text.", Some("doc.txt"), None)
            .await
            .unwrap();
        store.delete_by_source(&CollectionId::DURABLE, "doc.txt").await.unwrap();
        let hits = store.query(&CollectionId::DURABLE, "Some text", 5, 0.0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn import_rejects_dimension_mismatch_atomically() {
        let store = make_store();
        let bad_record = MemoryRecord {
            id: "r1".into(),
            collection: CollectionId::DURABLE,
            text: "x".into(),
            embedding: vec![0.0; 4],
            description: None,
            external_source: None,
            timestamp: Utc::now(),
        };
        let result = store
            .import(vec![CollectionSnapshot {
                collection: CollectionId::DURABLE,
                records: vec![bad_record],
            }])
            .await;
        assert!(result.is_err());
        let all = store.export(&[CollectionId::DURABLE]).await.unwrap();
        assert!(all[0].records.is_empty());
    }

    #[tokio::test]
    async fn export_round_trips_through_import() {
        let store = make_store();
        store.write_text(CollectionId::DURABLE, "round trip content.", None, None).await.unwrap();
        let snapshots = store.export(&[CollectionId::DURABLE]).await.unwrap();

        let store2 = make_store();
        store2.import(snapshots).await.unwrap();
        let hits = store2.query(&CollectionId::DURABLE, "round trip content", 5, 0.0).await.unwrap();
        assert!(!hits.is_empty());
    }
}
