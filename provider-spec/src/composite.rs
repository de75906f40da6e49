//! Composite resolver: chains multiple resolvers by priority.

use std::sync::Arc;

use async_trait::async_trait;

use super::resolver::ModelLimitResolver;
use super::spec::ModelSpec;

/// Chains multiple resolvers; returns the first non-`None` result.
pub struct CompositeResolver {
    sources: Vec<Arc<dyn ModelLimitResolver>>,
}

impl CompositeResolver {
    /// Create with the given sources, in priority order.
    pub fn new(sources: Vec<Arc<dyn ModelLimitResolver>>) -> Self {
        Self { sources }
    }

    /// Add a source at the end of the chain.
    pub fn push(&mut self, source: Arc<dyn ModelLimitResolver>) {
        self.sources.push(source);
    }
}

#[async_trait]
impl ModelLimitResolver for CompositeResolver {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        for source in &self.sources {
            if let Some(spec) = source.resolve(provider_id, model_id).await {
                return Some(spec);
            }
        }
        None
    }
}
