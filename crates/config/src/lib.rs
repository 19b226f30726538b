//! Configuration loading, validation, and the model registry for quill.
//!
//! Loads configuration from `~/.quill/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! The model registry maps short names ("flash", "sonnet") to fully
//! resolved `ModelConfig` entries, each tagged with a `ProviderKind` so the
//! provider implementation is selected once at config-load time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Which wire protocol a model speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI `/chat/completions` shape — covers OpenAI, Gemini's
    /// compatibility endpoint, Perplexity, and most hosted backends.
    OpenaiCompat,
    /// Anthropic's native Messages API.
    Anthropic,
}

/// One named entry in the model registry.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Wire protocol for this model.
    pub provider: ProviderKind,

    /// The model identifier sent on the wire.
    pub model_name: String,

    /// Base URL override (None = the provider's default endpoint).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key set directly in the config file (env var wins if both set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-model system prompt override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    8000
}

impl ModelConfig {
    /// Resolve the API key: explicit config value first, then the named
    /// environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_key_env", &self.api_key_env)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// The root configuration structure.
///
/// Maps directly to `~/.quill/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding all named sessions.
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,

    /// Directory holding the interaction record store.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Registry key of the model used when none is specified.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Registry key of the search-capable model used to resolve search terms.
    #[serde(default = "default_search_model")]
    pub search_model: String,

    /// Registry key of the small model used for interaction summaries.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Registry key of the embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Name of the system prompt used when none is specified.
    #[serde(default = "default_prompt_name")]
    pub default_prompt: String,

    /// Token ceiling for a single context file.
    #[serde(default = "default_max_file_tokens")]
    pub max_file_tokens: usize,

    /// Whether successful responses are recorded to the interaction store.
    #[serde(default = "default_true")]
    pub record_interactions: bool,

    /// The model registry.
    #[serde(default = "default_models")]
    pub models: HashMap<String, ModelConfig>,

    /// Named system prompts.
    #[serde(default = "default_prompts")]
    pub prompts: HashMap<String, String>,
}

fn default_sessions_dir() -> PathBuf {
    AppConfig::config_dir().join("sessions")
}
fn default_store_dir() -> PathBuf {
    AppConfig::config_dir().join("recall")
}
fn default_model() -> String {
    "flash".into()
}
fn default_search_model() -> String {
    "perplexity".into()
}
fn default_summary_model() -> String {
    "flash".into()
}
fn default_embedding_model() -> String {
    "embed".into()
}
fn default_prompt_name() -> String {
    "default".into()
}
fn default_max_file_tokens() -> usize {
    100_000
}
fn default_true() -> bool {
    true
}

fn default_models() -> HashMap<String, ModelConfig> {
    let mut models = HashMap::new();
    models.insert(
        "flash".into(),
        ModelConfig {
            provider: ProviderKind::OpenaiCompat,
            model_name: "gemini-2.0-flash".into(),
            base_url: Some("https://generativelanguage.googleapis.com/v1beta/openai".into()),
            api_key: None,
            api_key_env: Some("GEMINI_API_KEY".into()),
            temperature: 0.5,
            max_tokens: 8000,
            system_prompt: None,
        },
    );
    models.insert(
        "o1-mini".into(),
        ModelConfig {
            provider: ProviderKind::OpenaiCompat,
            model_name: "o1-mini".into(),
            base_url: None,
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".into()),
            temperature: 0.5,
            max_tokens: 65536,
            system_prompt: None,
        },
    );
    models.insert(
        "sonnet".into(),
        ModelConfig {
            provider: ProviderKind::Anthropic,
            model_name: "claude-sonnet-4-20250514".into(),
            base_url: None,
            api_key: None,
            api_key_env: Some("ANTHROPIC_API_KEY".into()),
            temperature: 0.5,
            max_tokens: 8000,
            system_prompt: None,
        },
    );
    models.insert(
        "perplexity".into(),
        ModelConfig {
            provider: ProviderKind::OpenaiCompat,
            model_name: "sonar".into(),
            base_url: Some("https://api.perplexity.ai".into()),
            api_key: None,
            api_key_env: Some("PERPLEXITY_API_KEY".into()),
            temperature: 0.5,
            max_tokens: 8000,
            system_prompt: Some(
                "You are a web-search assistant, that is tasked with providing a person \
                 with up-to-date information on something that needs real-time information access"
                    .into(),
            ),
        },
    );
    models.insert(
        "embed".into(),
        ModelConfig {
            provider: ProviderKind::OpenaiCompat,
            model_name: "text-embedding-3-small".into(),
            base_url: None,
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".into()),
            temperature: 0.0,
            max_tokens: 0,
            system_prompt: None,
        },
    );
    models
}

fn default_prompts() -> HashMap<String, String> {
    let mut prompts = HashMap::new();
    prompts.insert("default".into(), String::new());
    prompts.insert(
        "concise".into(),
        "Answer as briefly as possible. Prefer a single sentence; never add preamble.".into(),
    );
    prompts
}

impl AppConfig {
    /// Load configuration from the default path (~/.quill/config.toml).
    ///
    /// Environment variable overrides:
    /// - `QUILL_MODEL` — default model registry key
    /// - `QUILL_SESSIONS_DIR` — sessions directory
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("QUILL_MODEL") {
            config.default_model = model;
        }
        if let Ok(dir) = std::env::var("QUILL_SESSIONS_DIR") {
            config.sessions_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quill")
    }

    /// Look up a model registry entry.
    pub fn model(&self, key: &str) -> Option<&ModelConfig> {
        self.models.get(key)
    }

    /// Look up a named system prompt.
    pub fn prompt(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.models.contains_key(&self.default_model) {
            return Err(ConfigError::ValidationError(format!(
                "default_model '{}' is not in the model registry",
                self.default_model
            )));
        }

        for (key, model) in &self.models {
            if model.model_name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "model '{key}' has an empty model_name"
                )));
            }
            if model.temperature < 0.0 || model.temperature > 2.0 {
                return Err(ConfigError::ValidationError(format!(
                    "model '{key}': temperature must be between 0.0 and 2.0"
                )));
            }
        }

        if !self.prompts.contains_key(&self.default_prompt) {
            return Err(ConfigError::ValidationError(format!(
                "default_prompt '{}' is not a known prompt",
                self.default_prompt
            )));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            store_dir: default_store_dir(),
            default_model: default_model(),
            search_model: default_search_model(),
            summary_model: default_summary_model(),
            embedding_model: default_embedding_model(),
            default_prompt: default_prompt_name(),
            max_file_tokens: default_max_file_tokens(),
            record_interactions: default_true(),
            models: default_models(),
            prompts: default_prompts(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
