use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One chat message. Image attachments ride along with the user message
/// that referenced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDetails>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageDetails) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDetails {
    pub media_type: String,
    /// Base64-encoded image bytes, ready for the wire.
    pub data: String,
}

/// A provider-independent completion request; each client maps it onto its
/// own wire format.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn system_prompt(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn conversation_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }
}

/// Events emitted while a completion streams in.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    Done,
    Error(String),
}

/// The LLM client trait. Implementations provide both blocking and
/// streaming completion.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request and return the full response text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Send a completion request and return a stream of events.
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<futures::channel::mpsc::UnboundedReceiver<StreamEvent>>;
}
