//! Model specification: context limit, output limit, and optional cache limits.

use serde::{Deserialize, Serialize};

/// Model token limit specification.
///
/// Used by the Inference Driver to compute the output token budget for a call:
/// `max_output = max(min_floor, context_limit - estimated_input_tokens - safety_margin)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Context (input) token limit.
    pub context_limit: u32,
    /// Output token limit.
    pub output_limit: u32,
    /// Optional cache read token limit (e.g. for providers with prompt caching).
    #[serde(default)]
    pub cache_read: Option<u32>,
    /// Optional cache write token limit.
    #[serde(default)]
    pub cache_write: Option<u32>,
}

impl ModelSpec {
    pub fn new(context_limit: u32, output_limit: u32) -> Self {
        Self {
            context_limit,
            output_limit,
            cache_read: None,
            cache_write: None,
        }
    }

    pub fn with_cache_read(mut self, limit: u32) -> Self {
        self.cache_read = Some(limit);
        self
    }

    pub fn with_cache_write(mut self, limit: u32) -> Self {
        self.cache_write = Some(limit);
        self
    }
}

/// Which services a provider adapter implements.
///
/// The orchestrator selects providers by capability rather than by concrete type, so a
/// provider can light up `chat` only, or `chat` + `embed`, etc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub chat: bool,
    pub embed: bool,
    pub tts: bool,
    pub transcribe: bool,
    pub image: bool,
}

impl ProviderCapabilities {
    pub fn chat_only() -> Self {
        Self {
            chat: true,
            ..Default::default()
        }
    }

    pub fn chat_and_embed() -> Self {
        Self {
            chat: true,
            embed: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_cache_limits() {
        let spec = ModelSpec::new(100_000, 8_000)
            .with_cache_read(50_000)
            .with_cache_write(10_000);
        assert_eq!(spec.cache_read, Some(50_000));
        assert_eq!(spec.cache_write, Some(10_000));
    }

    #[test]
    fn chat_only_leaves_other_capabilities_false() {
        let caps = ProviderCapabilities::chat_only();
        assert!(caps.chat);
        assert!(!caps.embed);
        assert!(!caps.tts);
    }
}
