//! Builds provider-neutral completion requests for the built-in actions:
//! chat, edit code, auto apply, commit message and name lookups.

use uuid::Uuid;

use crate::config::Settings;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::llm::{CompletionRequest, ImageDetails, Message};
use crate::vfs::util as file_util;
use crate::vfs::VirtualFile;

/// A project file attached to a chat prompt as context.
#[derive(Debug, Clone)]
pub struct ReferencedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatParams {
    pub conversation: Conversation,
    pub prompt: String,
    pub session_id: Option<Uuid>,
    pub retry: bool,
    pub image: Option<ImageDetails>,
    pub referenced_files: Vec<ReferencedFile>,
}

impl ChatParams {
    pub fn new(conversation: Conversation, prompt: impl Into<String>) -> Self {
        Self {
            conversation,
            prompt: prompt.into(),
            session_id: None,
            retry: false,
            image: None,
            referenced_files: Vec::new(),
        }
    }

    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_image(mut self, image: ImageDetails) -> Self {
        self.image = Some(image);
        self
    }

    /// Attach an image from disk. The media type comes from the file
    /// extension; unsupported types are rejected before any request is
    /// built.
    pub fn with_image_from_path(self, path: &str) -> Result<Self> {
        use base64::Engine as _;

        let media_type = file_util::image_media_type(path)?;
        let bytes = std::fs::read(path)?;
        let image = ImageDetails {
            media_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        };
        Ok(self.with_image(image))
    }

    pub fn with_referenced_files(mut self, files: Vec<ReferencedFile>) -> Self {
        self.referenced_files = files;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EditCodeParams {
    pub prompt: String,
    pub selected_text: String,
}

#[derive(Debug, Clone)]
pub struct CommitMessageParams {
    pub git_diff: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone)]
pub struct LookupParams {
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct AutoApplyParams {
    pub source: String,
    pub destination: VirtualFile,
}

/// Builds [`CompletionRequest`]s from action parameters and the user's
/// settings. Per-backend wire differences are the clients' concern; one
/// factory serves every service.
pub struct RequestFactory {
    model: String,
    max_tokens: u32,
    temperature: f32,
    settings: Settings,
}

impl RequestFactory {
    pub fn for_settings(settings: &Settings) -> Self {
        Self {
            model: settings.active_service_config().model,
            max_tokens: settings.configuration.max_tokens,
            temperature: settings.configuration.clamped_temperature(),
            settings: settings.clone(),
        }
    }

    pub fn create_basic_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        stream: bool,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            max_tokens,
            temperature: Some(self.temperature),
            stream,
        }
    }

    /// Chat request over the whole conversation, with referenced files
    /// folded into the final prompt and an optional image attachment. On
    /// retry the superseded exchange is not replayed.
    pub fn create_chat_request(&self, params: &ChatParams) -> CompletionRequest {
        let mut messages = Vec::new();

        let history = &params.conversation.messages;
        let replayed = if params.retry && !history.is_empty() {
            &history[..history.len() - 1]
        } else {
            &history[..]
        };
        for exchange in replayed {
            messages.push(Message::user(exchange.prompt.clone()));
            if let Some(response) = &exchange.response {
                messages.push(Message::assistant(response.clone()));
            }
        }

        let prompt = prompt_with_context(&params.referenced_files, &params.prompt);
        let mut user_message = Message::user(prompt);
        if let Some(image) = &params.image {
            user_message = user_message.with_image(image.clone());
        }
        messages.push(user_message);

        CompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            stream: true,
        }
    }

    pub fn create_edit_code_request(&self, params: &EditCodeParams) -> CompletionRequest {
        let prompt = format!(
            "Code to modify:\n{}\n\nInstructions: {}",
            params.selected_text, params.prompt
        );
        self.create_basic_request(self.settings.prompts.edit_code(), &prompt, 8192, true)
    }

    pub fn create_commit_message_request(&self, params: &CommitMessageParams) -> CompletionRequest {
        self.create_basic_request(&params.system_prompt, &params.git_diff, 512, true)
    }

    pub fn create_lookup_request(&self, params: &LookupParams) -> CompletionRequest {
        self.create_basic_request(self.settings.prompts.name_lookups(), &params.prompt, 512, false)
    }

    /// Request that merges `source` into the destination file via
    /// search/replace edits. Fails when the destination cannot be read.
    pub fn create_auto_apply_request(&self, params: &AutoApplyParams) -> Result<CompletionRequest> {
        let destination_text = params.destination.read_text()?;
        let destination_path = params.destination.path().display().to_string();

        let mut prompt = String::new();
        prompt.push_str("Source:\n");
        prompt.push_str(&format_code(&params.source, None));
        prompt.push_str("\n\nDestination:\n");
        prompt.push_str(&format_code(&destination_text, Some(&destination_path)));
        prompt.push('\n');

        Ok(self.create_basic_request(self.settings.prompts.auto_apply(), &prompt, 8192, true))
    }
}

/// Render code as a fenced block, with a `language:path` header when the
/// path is known so responses can address the same file.
pub fn format_code(code: &str, path: Option<&str>) -> String {
    let header = match path {
        Some(path) => {
            let extension = file_util::file_extension(path);
            let language = file_util::language_for_extension(&extension)
                .unwrap_or_default()
                .to_lowercase();
            format!("{language}:{path}")
        }
        None => String::new(),
    };
    format!("```{header}\n{code}\n```")
}

fn prompt_with_context(files: &[ReferencedFile], prompt: &str) -> String {
    if files.is_empty() {
        return prompt.to_string();
    }
    let mut out = String::new();
    for file in files {
        out.push_str(&format_code(&file.content, Some(&file.path)));
        out.push_str("\n\n");
    }
    out.push_str(prompt);
    out
}
