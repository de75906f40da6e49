//! Local file resolver: read model specs from a JSON manifest.
//!
//! Grounds the "dynamic registration via filesystem scanning" pattern replaced by a
//! declarative registry: the manifest is loaded once at startup (or on demand) rather
//! than probed against a remote service.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::resolver::ModelLimitResolver;
use super::spec::ModelSpec;

#[derive(Deserialize)]
struct ManifestModel {
    context_limit: u32,
    output_limit: u32,
    #[serde(default)]
    cache_read: Option<u32>,
    #[serde(default)]
    cache_write: Option<u32>,
}

#[derive(Deserialize)]
struct ManifestProvider {
    models: std::collections::HashMap<String, ManifestModel>,
}

type Manifest = std::collections::HashMap<String, ManifestProvider>;

/// Resolves model specs from a local JSON manifest: `{provider_id: {models: {model_id: {...}}}}`.
pub struct LocalFileResolver {
    path: PathBuf,
    data: RwLock<Option<Manifest>>,
}

impl LocalFileResolver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            data: RwLock::new(None),
        }
    }

    /// Load (or reload) the manifest from disk.
    pub async fn load(&self) -> Result<(), String> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| e.to_string())?;
        let manifest: Manifest = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
        *self.data.write().await = Some(manifest);
        Ok(())
    }

    async fn ensure_loaded(&self) -> bool {
        {
            let guard = self.data.read().await;
            if guard.is_some() {
                return true;
            }
        }
        self.load().await.is_ok()
    }
}

#[async_trait]
impl ModelLimitResolver for LocalFileResolver {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        if !self.ensure_loaded().await {
            return None;
        }
        let guard = self.data.read().await;
        let manifest = guard.as_ref()?;
        let model = manifest.get(provider_id)?.models.get(model_id)?;
        Some(ModelSpec {
            context_limit: model.context_limit,
            output_limit: model.output_limit,
            cache_read: model.cache_read,
            cache_write: model.cache_write,
        })
    }
}
