//! Engine configuration, one serde section per concern.
//!
//! Every section is `#[serde(default)]`, so a `config.toml` only needs the
//! keys it changes.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHAT_HISTORY_LIMIT, DEFAULT_HISTORY_WINDOW, DEFAULT_HOST, DEFAULT_MODEL,
    DEFAULT_MODEL_BASE_URL, DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_PORT,
};
use crate::persona::PersonaConfig;
use crate::retrieval::RetrievalPolicy;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelConfig,
    pub retrieval: RetrievalPolicy,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub persona: PersonaConfig,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// No key means degraded mode.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub chat_history_limit: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            chat_history_limit: DEFAULT_CHAT_HISTORY_LIMIT,
        }
    }
}

impl ModelConfig {
    /// Key if set and non-blank.
    pub fn usable_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Resource name with the `models/` prefix the API expects.
    pub fn model_path(&self) -> String {
        let name = self.model.trim();
        if name.starts_with("models/") || name.starts_with("tunedModels/") {
            name.to_string()
        } else {
            format!("models/{name}")
        }
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("chat_history_limit", &self.chat_history_limit)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_HISTORY_WINDOW,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served at `/` next to the API routes.
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.model.usable_key().is_none());
        assert_eq!(config.session.max_history, 10);
        assert_eq!(config.retrieval.max_results, 2);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_blank_key_is_unusable() {
        let model = ModelConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(model.usable_key().is_none());
    }

    #[test]
    fn test_model_path_prefix() {
        let mut model = ModelConfig::default();
        assert_eq!(model.model_path(), "models/gemini-2.5-flash");
        model.model = "gemini-1.5-pro".to_string();
        assert_eq!(model.model_path(), "models/gemini-1.5-pro");
    }

    #[test]
    fn test_debug_redacts_key() {
        let model = ModelConfig {
            api_key: Some("secret-123".to_string()),
            ..Default::default()
        };
        let debug = format!("{model:?}");
        assert!(!debug.contains("secret-123"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_partial_json_section() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"session": {"max_history": 4}}"#).unwrap();
        assert_eq!(config.session.max_history, 4);
        assert_eq!(config.model, ModelConfig::default());
    }
}
