pub mod prompts;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::{LlmClient, ServiceConfig, ServiceKind};
use self::prompts::CorePrompts;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// The service requests are routed to.
    pub service: ServiceKind,
    /// Per-service connection overrides; services without an entry use
    /// their defaults.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    pub configuration: ConfigurationState,
    #[serde(default)]
    pub prompts: CorePrompts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationState {
    pub max_tokens: u32,
    /// Clamped to [0, 1] when read; out-of-range values in the file are
    /// tolerated.
    pub temperature: f32,
    pub check_for_updates: bool,
    pub auto_formatting_enabled: bool,
    pub chat: ChatCompletionState,
    pub code_completion: CodeCompletionState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionState {
    pub editor_context_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCompletionState {
    pub git_diff_enabled: bool,
    pub context_aware_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceKind::Ollama,
            services: Vec::new(),
            configuration: ConfigurationState {
                max_tokens: 8192,
                temperature: 0.1,
                check_for_updates: true,
                auto_formatting_enabled: true,
                chat: ChatCompletionState {
                    editor_context_enabled: true,
                },
                code_completion: CodeCompletionState {
                    git_diff_enabled: true,
                    context_aware_enabled: false,
                },
            },
            prompts: CorePrompts::default(),
        }
    }
}

impl ConfigurationState {
    pub fn clamped_temperature(&self) -> f32 {
        self.temperature.clamp(0.0, 1.0)
    }
}

impl Settings {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("graft")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(content) = std::fs::read_to_string(path) {
                match toml::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => {
                        tracing::warn!("ignoring malformed config at {}: {e}", path.display());
                    }
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), crate::error::GraftError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), crate::error::GraftError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GraftError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved config for a service: the stored entry when present, the
    /// service defaults otherwise.
    pub fn service_config(&self, kind: ServiceKind) -> ServiceConfig {
        self.services
            .iter()
            .find(|s| s.kind == kind)
            .cloned()
            .unwrap_or_else(|| ServiceConfig::defaults_for(kind))
    }

    pub fn active_service_config(&self) -> ServiceConfig {
        self.service_config(self.service)
    }

    /// Build an LLM client for the active service.
    pub fn build_llm_client(&self) -> Result<Box<dyn LlmClient>, crate::error::GraftError> {
        self.active_service_config().build_client()
    }
}
