//! Cached resolver: in-memory cache wrapper for any `ModelLimitResolver`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::resolver::ModelLimitResolver;
use super::spec::ModelSpec;

/// Wraps any resolver with an in-memory cache, keyed by `provider_id/model_id`.
pub struct CachedResolver<R> {
    inner: R,
    cache: Arc<RwLock<HashMap<String, ModelSpec>>>,
}

impl<R> CachedResolver<R>
where
    R: ModelLimitResolver,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Merge new specs into the cache.
    pub async fn refresh(&self, specs: HashMap<String, ModelSpec>) {
        let mut cache = self.cache.write().await;
        for (k, v) in specs {
            cache.insert(k, v);
        }
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R> ModelLimitResolver for CachedResolver<R>
where
    R: ModelLimitResolver + Send + Sync,
{
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        let key = format!("{provider_id}/{model_id}");
        {
            let cache = self.cache.read().await;
            if let Some(spec) = cache.get(&key).cloned() {
                return Some(spec);
            }
        }
        let spec = self.inner.resolve(provider_id, model_id).await?;
        {
            let mut cache = self.cache.write().await;
            cache.insert(key, spec.clone());
        }
        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigOverride;

    #[tokio::test]
    async fn cache_hits_return_same_spec() {
        let cached = CachedResolver::new(ConfigOverride::new(10_000).with_output_limit(1_000));
        let a = cached.resolve("x", "y").await.unwrap();
        let b = cached.resolve("x", "y").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn clear_forces_recompute() {
        let cached = CachedResolver::new(ConfigOverride::new(10_000));
        cached.resolve("x", "y").await.unwrap();
        cached.clear().await;
        assert!(cached.cache.read().await.is_empty());
    }
}
