use serde::{Deserialize, Serialize};

use crate::error::{GraftError, Result};
use crate::llm::{AnthropicClient, GoogleClient, LlamaCppClient, LlmClient, OllamaClient, OpenAiClient};

/// Identifies an LLM backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// The hosted service; OpenAI-compatible wire format behind vendor auth.
    Hosted,
    OpenAi,
    CustomOpenAi,
    Anthropic,
    Google,
    Ollama,
    LlamaCpp,
}

impl ServiceKind {
    pub fn name(&self) -> &str {
        match self {
            Self::Hosted => "Graft Cloud",
            Self::OpenAi => "OpenAI",
            Self::CustomOpenAi => "Custom OpenAI-compatible",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google",
            Self::Ollama => "Ollama (Local)",
            Self::LlamaCpp => "llama.cpp (Local)",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama | Self::LlamaCpp)
    }

    pub fn needs_api_key(&self) -> bool {
        !self.is_local()
    }

    pub fn default_base_url(&self) -> &str {
        match self {
            Self::Hosted => "https://api.graft.dev",
            Self::OpenAi => "https://api.openai.com",
            Self::CustomOpenAi => "http://localhost:8000",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Google => "https://generativelanguage.googleapis.com",
            Self::Ollama => "http://localhost:11434",
            Self::LlamaCpp => "http://localhost:8080",
        }
    }

    pub fn default_api_key_env(&self) -> &str {
        match self {
            Self::Hosted => "GRAFT_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::CustomOpenAi => "CUSTOM_OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Google => "GEMINI_API_KEY",
            Self::Ollama | Self::LlamaCpp => "",
        }
    }

    pub fn default_model(&self) -> &str {
        match self {
            Self::Hosted => "gpt-4o-mini",
            Self::OpenAi => "gpt-4o",
            Self::CustomOpenAi => "default",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Google => "gemini-2.0-flash",
            Self::Ollama => "qwen2.5-coder",
            Self::LlamaCpp => "default",
        }
    }

    pub fn all() -> [ServiceKind; 7] {
        [
            Self::Hosted,
            Self::OpenAi,
            Self::CustomOpenAi,
            Self::Anthropic,
            Self::Google,
            Self::Ollama,
            Self::LlamaCpp,
        ]
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolved connection parameters for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub kind: ServiceKind,
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
}

impl ServiceConfig {
    pub fn defaults_for(kind: ServiceKind) -> Self {
        Self {
            kind,
            api_key_env: kind.default_api_key_env().to_string(),
            base_url: kind.default_base_url().to_string(),
            model: kind.default_model().to_string(),
        }
    }

    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env).ok()
    }

    fn required_api_key(&self) -> Result<String> {
        self.api_key().ok_or_else(|| {
            GraftError::Config(format!(
                "set the {} environment variable for {}",
                self.api_key_env,
                self.kind.name()
            ))
        })
    }

    /// Build an LLM client for this service.
    pub fn build_client(&self) -> Result<Box<dyn LlmClient>> {
        match self.kind {
            ServiceKind::Anthropic => {
                let client =
                    AnthropicClient::new(self.required_api_key()?).with_base_url(&self.base_url);
                Ok(Box::new(client))
            }
            ServiceKind::Google => {
                let client =
                    GoogleClient::new(self.required_api_key()?).with_base_url(&self.base_url);
                Ok(Box::new(client))
            }
            ServiceKind::Ollama => {
                Ok(Box::new(OllamaClient::new().with_base_url(&self.base_url)))
            }
            ServiceKind::LlamaCpp => Ok(Box::new(
                LlamaCppClient::new().with_base_url(&self.base_url),
            )),
            ServiceKind::Hosted => {
                let client = OpenAiClient::new(self.required_api_key()?)
                    .with_base_url(&self.base_url)
                    .with_header("x-graft-client", "graft-core");
                Ok(Box::new(client))
            }
            // Custom deployments may run without auth; pass the key through
            // when one is configured.
            ServiceKind::OpenAi | ServiceKind::CustomOpenAi => {
                let api_key = if self.kind == ServiceKind::OpenAi {
                    self.required_api_key()?
                } else {
                    self.api_key().unwrap_or_default()
                };
                let client = OpenAiClient::new(api_key).with_base_url(&self.base_url);
                Ok(Box::new(client))
            }
        }
    }
}
