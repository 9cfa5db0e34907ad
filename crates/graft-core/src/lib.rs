pub mod completions;
pub mod config;
pub mod conversation;
pub mod diff;
pub mod error;
pub mod llm;
pub mod parser;
pub mod vfs;

// Re-export key types
pub use config::Settings;
pub use conversation::{Conversation, ConversationMessage, ConversationStorage};
pub use diff::{
    DiffChange, DiffEditorManager, DiffEditorState, DiffHeader, DiffStats, Document, EditorKind,
    EventLoop, Side, UnifiedDiffViewer, WorkerPool,
};
pub use error::GraftError;
pub use llm::{CompletionRequest, LlmClient, Message, Role, ServiceKind, StreamEvent};
pub use parser::{MessageParser, Segment};
