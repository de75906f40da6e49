pub mod chunk;
pub mod embedder;
pub mod in_memory_vector_store;
pub mod store;
pub mod vector_store;

pub use embedder::Embedder;
pub use in_memory_vector_store::InMemoryVectorStore;
pub use store::{CollectionSnapshot, MemoryStore, ScoredRecord};
pub use vector_store::{CollectionId, MemoryRecord, VectorStore};
