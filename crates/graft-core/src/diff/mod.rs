mod dispatch;
mod document;
mod header;
mod manager;
mod state;
mod stats;
mod viewer;

pub use dispatch::{EventLoop, UiToken, WorkerPool};
pub use document::Document;
pub use header::{DiffHeader, HeaderConfig, HeaderLink, StatsListener};
pub use manager::DiffEditorManager;
pub use state::{DiffEditorState, EditorKind};
pub use stats::DiffStats;
pub use viewer::{DiffChange, Side, UnifiedDiffViewer};
