use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;

/// One prompt/response exchange inside a conversation. The response stays
/// `None` while a completion is streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub prompt: String,
    pub response: Option<String>,
}

impl ConversationMessage {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            response: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub messages: Vec<ConversationMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: None,
            created_on: now,
            updated_on: now,
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, message: ConversationMessage) {
        self.messages.push(message);
        self.updated_on = Utc::now();
    }

    pub fn set_response(&mut self, message_id: Uuid, response: impl Into<String>) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            message.response = Some(response.into());
            self.updated_on = Utc::now();
        }
    }

    pub fn last_message(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }
}

/// JSON-file store for past conversations, kept next to the config file.
pub struct ConversationStorage {
    path: PathBuf,
}

impl Default for ConversationStorage {
    fn default() -> Self {
        Self::new(Settings::config_dir().join("conversations.json"))
    }
}

impl ConversationStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> Vec<Conversation> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_str(&content) {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::warn!(
                    "ignoring malformed conversation store at {}: {e}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    pub fn find(&self, id: Uuid) -> Option<Conversation> {
        self.load_all().into_iter().find(|c| c.id == id)
    }

    /// Insert or update one conversation and write the store back out.
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut conversations = self.load_all();
        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => conversations.push(conversation.clone()),
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&conversations)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
