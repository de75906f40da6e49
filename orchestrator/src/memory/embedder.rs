//! Embedder trait: produces fixed-dimension vectors from text for the memory store.

use async_trait::async_trait;

use crate::error::OrchestratorError;

/// Produces fixed-size float vectors from text.
///
/// Implementations wrap a concrete embedding provider, or a deterministic mock for
/// tests. Must be `Send + Sync` for use behind `Arc<dyn Embedder>`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text into a vector of dimension [`Embedder::dim`], one per input in
    /// the same order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, OrchestratorError>;

    /// Vector dimension returned by [`Embedder::embed`].
    fn dim(&self) -> usize;

    /// Maximum chunk size, in tokens, this embedder accepts well. Used by
    /// [`crate::memory::chunk::chunk_text`] when no caller override is given.
    fn chunk_size(&self) -> usize {
        128
    }

    /// Approximate token count for text, used for prompt budgeting when the embedder's
    /// own tokenizer isn't exposed. Default: whitespace-split word count.
    fn approximate_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
