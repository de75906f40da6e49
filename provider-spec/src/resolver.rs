//! Model limit resolver trait for querying model specifications.

use async_trait::async_trait;

use super::spec::ModelSpec;

/// Resolves model specifications (context limit, output limit) by provider and model id.
///
/// Implementations may read from local manifests, an agent's explicit config override,
/// or serve from an in-memory cache. The Inference Driver uses the resolved spec to
/// compute its output token budget.
#[async_trait]
pub trait ModelLimitResolver: Send + Sync {
    /// Resolve model spec for the given provider and model.
    ///
    /// Returns `None` if the model is unknown or resolution fails.
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec>;
}
