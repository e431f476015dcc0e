use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SidechatError;
use crate::llm::{OpenAIClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::session::{ChatSession, DEFAULT_FALLBACK_MESSAGE};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Stream replies; when false the whole reply arrives at once.
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatSettings {
    pub system_prompt: Option<String>,
    pub fallback_message: String,
    /// Largest workspace file that can be attached.
    pub max_file_bytes: u64,
    pub theme: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            stream: true,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            max_file_bytes: 256 * 1024,
            theme: crate::render::markdown::DEFAULT_THEME.to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sidechat")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "ignoring unreadable config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SidechatError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SidechatError::Config(e.to_string()))
    }

    pub fn save(&self) -> Result<(), SidechatError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SidechatError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SidechatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn build_llm_client(&self) -> Result<OpenAIClient, SidechatError> {
        let api_key = self.api_key().ok_or_else(|| {
            SidechatError::Config(format!(
                "API key not found: set the {} environment variable",
                self.llm.api_key_env
            ))
        })?;
        Ok(OpenAIClient::new(api_key)
            .with_model(&self.llm.model)
            .with_base_url(&self.llm.base_url))
    }

    /// Build a session around `client` configured from these settings.
    pub fn build_session(&self, client: Box<dyn crate::llm::LlmClient>) -> ChatSession {
        let session = ChatSession::new(client)
            .with_streaming(self.llm.stream)
            .with_fallback_message(&self.chat.fallback_message);
        match &self.chat.system_prompt {
            Some(prompt) => session.with_system_prompt(prompt),
            None => session,
        }
    }
}
