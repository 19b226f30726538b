//! Provider router — maps model-registry keys to provider instances.
//!
//! One provider is built per configured model entry. Keys with no resolvable
//! API key still get a registry slot so `models` listing works, but resolving
//! them for a request returns `NotConfigured`.

use std::collections::HashMap;
use std::sync::Arc;

use quill_config::{AppConfig, ModelConfig, ProviderKind};
use quill_core::error::ProviderError;
use quill_core::provider::Provider;
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

struct RouterEntry {
    provider: Option<Arc<dyn Provider>>,
    config: ModelConfig,
}

/// Routes requests to the provider backing a given model key.
pub struct ProviderRouter {
    entries: HashMap<String, RouterEntry>,
    default_model: String,
}

impl ProviderRouter {
    /// Build a router from configuration, one provider per model entry.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut entries = HashMap::new();

        for (key, model_config) in &config.models {
            let provider = build_provider(key, model_config);
            if provider.is_none() {
                debug!(model = %key, "No API key resolved; model registered but unavailable");
            }
            entries.insert(
                key.clone(),
                RouterEntry {
                    provider,
                    config: model_config.clone(),
                },
            );
        }

        Self {
            entries,
            default_model: config.default_model.clone(),
        }
    }

    /// Resolve a model key to its provider and configuration.
    ///
    /// An empty key resolves to the configured default model.
    pub fn resolve(
        &self,
        key: &str,
    ) -> std::result::Result<(Arc<dyn Provider>, &ModelConfig), ProviderError> {
        let key = if key.is_empty() {
            &self.default_model
        } else {
            key
        };

        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| ProviderError::ModelNotFound(key.to_string()))?;

        let provider = entry.provider.clone().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "No API key available for model '{key}' (set {} or add api_key to config)",
                entry
                    .config
                    .api_key_env
                    .as_deref()
                    .unwrap_or("the api_key_env variable")
            ))
        })?;

        Ok((provider, &entry.config))
    }

    /// Model keys in the registry, sorted for stable display.
    pub fn model_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Whether a model key can actually serve requests.
    pub fn is_available(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.provider.is_some())
    }
}

fn build_provider(key: &str, config: &ModelConfig) -> Option<Arc<dyn Provider>> {
    let api_key = config.resolve_api_key()?;

    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::Anthropic => {
            let mut p = AnthropicProvider::new(&api_key);
            if let Some(ref base_url) = config.base_url {
                p = p.with_base_url(base_url);
            }
            Arc::new(p)
        }
        ProviderKind::OpenaiCompat => {
            let base_url = config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            Arc::new(OpenAiCompatProvider::new(key, base_url, &api_key))
        }
    };

    Some(provider)
}
