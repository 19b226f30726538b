//! Shared plumbing for the command handlers: config + router bundle,
//! provider-backed adapters for embedding/summaries/search, streaming
//! output, and interaction recording.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use quill_config::{AppConfig, ModelConfig};
use quill_core::error::ProviderError;
use quill_core::message::Message;
use quill_core::provider::{Embedder, EmbeddingRequest, Provider, ProviderRequest};
use quill_core::token::estimate_tokens;
use quill_providers::ProviderRouter;
use quill_recall::{InteractionStore, Summarizer};
use tracing::warn;

/// Everything a command handler needs, built once per invocation.
pub struct App {
    pub config: AppConfig,
    pub router: ProviderRouter,
}

impl App {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::load().context("Failed to load configuration")?;
        let router = ProviderRouter::from_config(&config);
        Ok(Self { config, router })
    }

    /// Resolve a model key, falling back to the configured default.
    pub fn resolve_model(
        &self,
        key: Option<&str>,
    ) -> anyhow::Result<(Arc<dyn Provider>, ModelConfig)> {
        let (provider, config) = self
            .router
            .resolve(key.unwrap_or(""))
            .map_err(anyhow::Error::from)?;
        Ok((provider, config.clone()))
    }

    /// Look up a named system prompt, erroring with the known names.
    pub fn prompt_text(&self, name: Option<&str>) -> anyhow::Result<String> {
        let name = name.unwrap_or(&self.config.default_prompt);
        match self.config.prompt(name) {
            Some(text) => Ok(text.to_string()),
            None => {
                let mut known: Vec<&str> = self.config.prompts.keys().map(String::as_str).collect();
                known.sort_unstable();
                bail!("Unknown prompt '{name}' (known: {})", known.join(", "));
            }
        }
    }

    /// Search-term resolver backed by the configured search model.
    /// A missing API key surfaces per-term, where it is logged and dropped.
    pub fn search_resolver(&self) -> ModelSearchResolver {
        let backend = self
            .router
            .resolve(&self.config.search_model)
            .ok()
            .map(|(provider, config)| (provider, config.clone()));
        ModelSearchResolver { backend }
    }

    /// Embedder backed by the configured embedding model. Required for any
    /// store operation, so failure to resolve is an error here.
    pub fn embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        let (provider, config) = self
            .router
            .resolve(&self.config.embedding_model)
            .context("Embedding model is not configured")?;
        Ok(Arc::new(ModelEmbedder {
            provider,
            model_name: config.model_name.clone(),
        }))
    }

    fn summarizer(&self) -> Option<Arc<dyn Summarizer>> {
        let (provider, config) = self.router.resolve(&self.config.summary_model).ok()?;
        Some(Arc::new(ModelSummarizer {
            provider,
            config: config.clone(),
        }))
    }

    /// Open the interaction store with the configured embedder and summarizer.
    pub fn store(&self) -> anyhow::Result<InteractionStore> {
        let embedder = self.embedder()?;
        Ok(InteractionStore::open(
            self.config.store_dir.join("records.jsonl"),
            embedder,
            self.summarizer(),
        ))
    }

    /// Best-effort recording of a completed interaction. Failures are
    /// logged, never surfaced: a delivered answer is not retracted because
    /// bookkeeping broke.
    pub async fn record_interaction(
        &self,
        query: &str,
        response: &str,
        model_key: &str,
        kind: &str,
        file_path: Option<String>,
    ) {
        if !self.config.record_interactions {
            return;
        }

        let store = match self.store() {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Skipping interaction recording");
                return;
            }
        };

        if let Err(e) = store.add(query, response, model_key, kind, file_path).await {
            warn!(error = %e, "Failed to record interaction");
        }
    }
}

/// Build a request from a model's registry entry.
pub fn request_for(config: &ModelConfig, messages: Vec<Message>, stream: bool) -> ProviderRequest {
    ProviderRequest {
        model: config.model_name.clone(),
        messages,
        temperature: config.temperature,
        max_tokens: (config.max_tokens > 0).then_some(config.max_tokens),
        stream,
    }
}

/// Sum of estimated tokens across all message text.
pub fn estimate_message_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|m| estimate_tokens(&m.content.text()))
        .sum()
}

/// Stream a response to stdout, returning the full text.
///
/// Returns `Ok(None)` when the user interrupts: the caller must not persist
/// anything in that case.
pub async fn stream_to_stdout(
    provider: &dyn Provider,
    request: ProviderRequest,
) -> Result<Option<String>, ProviderError> {
    let mut rx = provider.stream(request).await?;
    let mut full = String::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStreaming interrupted");
                return Ok(None);
            }
            chunk = rx.recv() => {
                match chunk {
                    Some(Ok(chunk)) => {
                        if let Some(text) = chunk.content {
                            print!("{text}");
                            let _ = std::io::stdout().flush();
                            full.push_str(&text);
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
        }
    }

    println!();
    Ok(Some(full))
}

/// `Embedder` over a provider's embedding endpoint.
pub struct ModelEmbedder {
    provider: Arc<dyn Provider>,
    model_name: String,
}

#[async_trait]
impl Embedder for ModelEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model_name.clone(),
                inputs: vec![text.to_string()],
            })
            .await?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "Empty embedding response".into(),
            })
    }
}

/// `Summarizer` over the configured summary model.
struct ModelSummarizer {
    provider: Arc<dyn Provider>,
    config: ModelConfig,
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, query: &str, response: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Below is a query and its response. Create a concise one-sentence summary \
             (max 15 words) that captures the key insight or action from this interaction:\n\n\
             [QUERY]\n{query}\n\n[RESPONSE]\n{response}\n\nSummary: "
        );

        let request = request_for(&self.config, vec![Message::user(prompt)], false);
        let result = self.provider.complete(request).await?;

        let summary = result
            .content
            .trim()
            .strip_prefix("Summary:")
            .map(str::trim)
            .unwrap_or(result.content.trim())
            .to_string();
        Ok(summary)
    }
}

/// `SearchResolver` over the configured search-capable model.
pub struct ModelSearchResolver {
    backend: Option<(Arc<dyn Provider>, ModelConfig)>,
}

#[async_trait]
impl quill_context::SearchResolver for ModelSearchResolver {
    async fn resolve(&self, term: &str) -> Result<String, ProviderError> {
        let Some((provider, config)) = &self.backend else {
            return Err(ProviderError::NotConfigured(
                "Search model is not configured".into(),
            ));
        };

        let mut messages = Vec::new();
        if let Some(ref system) = config.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(term));

        let request = request_for(config, messages, false);
        Ok(provider.complete(request).await?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_config::ProviderKind;

    fn model(max_tokens: u32) -> ModelConfig {
        ModelConfig {
            provider: ProviderKind::OpenaiCompat,
            model_name: "test".into(),
            base_url: None,
            api_key: None,
            api_key_env: None,
            temperature: 0.7,
            max_tokens,
            system_prompt: None,
        }
    }

    #[test]
    fn request_carries_model_settings() {
        let req = request_for(&model(8000), vec![Message::user("hi")], true);
        assert_eq!(req.model, "test");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, Some(8000));
        assert!(req.stream);
    }

    #[test]
    fn zero_max_tokens_means_unset() {
        let req = request_for(&model(0), vec![], false);
        assert_eq!(req.max_tokens, None);
    }

    #[test]
    fn token_estimate_covers_all_messages() {
        let messages = vec![Message::user("aaaa"), Message::assistant("bbbbbbbb")];
        assert_eq!(estimate_message_tokens(&messages), 1 + 2);
    }
}
