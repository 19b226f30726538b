//! Session metadata — the YAML header at the top of every session file.

use serde::{Deserialize, Serialize};

/// Metadata stored between `---` markers at the top of a session file.
///
/// Every field has a default so a hand-edited or truncated header still
/// parses; missing keys simply take their zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Creation timestamp, `YYYY-MM-DD HH:MM:SS` in UTC.
    pub created_at: String,

    /// Model registry key used for this session.
    pub llm_config: String,

    /// File names attached to the session (live under the session's `files/` dir).
    pub files: Vec<String>,

    /// Search terms attached to the session (cached under `search/`).
    pub search: Vec<String>,

    /// Running token estimate for the attached context.
    pub current_tokens: usize,

    /// Named system prompt override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Default for SessionMeta {
    fn default() -> Self {
        Self {
            session_name: None,
            created_at: String::new(),
            llm_config: "flash".into(),
            files: Vec::new(),
            search: Vec::new(),
            current_tokens: 0,
            prompt: None,
        }
    }
}

impl SessionMeta {
    /// Build metadata for a brand-new session.
    pub fn fresh(name: &str, model_key: &str, prompt: Option<&str>) -> Self {
        Self {
            session_name: Some(name.to_string()),
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            llm_config: model_key.to_string(),
            prompt: prompt.map(String::from),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_sets_name_and_model() {
        let meta = SessionMeta::fresh("rust-help", "sonnet", Some("concise"));
        assert_eq!(meta.session_name.as_deref(), Some("rust-help"));
        assert_eq!(meta.llm_config, "sonnet");
        assert_eq!(meta.prompt.as_deref(), Some("concise"));
        assert!(!meta.created_at.is_empty());
        assert_eq!(meta.current_tokens, 0);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let meta: SessionMeta = serde_yaml::from_str("llm_config: o1-mini\n").unwrap();
        assert_eq!(meta.llm_config, "o1-mini");
        assert!(meta.files.is_empty());
        assert!(meta.session_name.is_none());
    }

    #[test]
    fn yaml_round_trip() {
        let meta = SessionMeta::fresh("demo", "flash", None);
        let yaml = serde_yaml::to_string(&meta).unwrap();
        let back: SessionMeta = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(meta, back);
    }

    #[test]
    fn none_options_omitted_from_yaml() {
        let meta = SessionMeta::default();
        let yaml = serde_yaml::to_string(&meta).unwrap();
        assert!(!yaml.contains("session_name"));
        assert!(!yaml.contains("prompt"));
    }
}
