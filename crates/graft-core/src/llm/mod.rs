mod anthropic;
mod google;
mod llama_cpp;
mod ollama;
mod openai;
pub mod service;
mod traits;

pub use anthropic::AnthropicClient;
pub use google::GoogleClient;
pub use llama_cpp::LlamaCppClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use service::{ServiceConfig, ServiceKind};
pub use traits::*;
