use std::sync::{Arc, Mutex};

use crate::diff::dispatch::{EventLoop, WorkerPool};
use crate::diff::header::DiffHeader;
use crate::diff::manager::DiffEditorManager;
use crate::diff::viewer::{DiffChange, Side, UnifiedDiffViewer};
use crate::error::Result;
use crate::parser::Segment;
use crate::vfs::OpenFileCallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Standard,
    Diff,
}

/// Drives one diff editor: dispatches incoming segments to the content
/// updater, handles "apply all", and resyncs the view after external
/// changes. Stateless across segments; each decision looks only at the
/// latest segment and the editor kind.
pub struct DiffEditorState {
    editor_kind: EditorKind,
    event_loop: Arc<EventLoop>,
    worker_pool: Arc<WorkerPool>,
    manager: Arc<DiffEditorManager>,
    header: Mutex<Option<Arc<DiffHeader>>>,
    open_file: Option<OpenFileCallback>,
}

impl DiffEditorState {
    pub fn new(
        editor_kind: EditorKind,
        event_loop: Arc<EventLoop>,
        worker_pool: Arc<WorkerPool>,
        manager: Arc<DiffEditorManager>,
    ) -> Self {
        Self {
            editor_kind,
            event_loop,
            worker_pool,
            manager,
            header: Mutex::new(None),
            open_file: None,
        }
    }

    pub fn with_open_file(mut self, open_file: OpenFileCallback) -> Self {
        self.open_file = Some(open_file);
        self
    }

    /// Explicit observer registration; replaces reaching back into a
    /// component tree to find the header.
    pub fn set_header(&self, header: Arc<DiffHeader>) {
        let mut slot = self
            .header
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(header);
    }

    pub fn viewer(&self) -> &Arc<UnifiedDiffViewer> {
        self.manager.viewer()
    }

    pub fn manager(&self) -> &Arc<DiffEditorManager> {
        &self.manager
    }

    /// Feed the latest streamed segment into the diff. Only search/replace
    /// segments are relevant, and only while this editor renders a diff.
    pub fn update_content(&self, segment: &Segment) {
        if self.editor_kind != EditorKind::Diff {
            return;
        }
        let (search, replace) = match segment {
            Segment::SearchReplace { search, replace, .. } => (search, replace),
            Segment::ReplaceWaiting { search, replace, .. } => (search, replace),
            _ => return,
        };

        if !self.manager.update_diff_content(search, replace) {
            return;
        }

        // The updater queued the mutation + rediff ahead of us, so reading
        // the hunk list from a follow-up UI job observes the updated state.
        let header = self.header();
        if let Some(header) = header {
            let viewer = Arc::clone(self.manager.viewer());
            self.event_loop.run_in_ui(move |_token| {
                header.reconcile_stats(&viewer.diff_changes());
            });
        }
    }

    /// Apply every outstanding hunk into the base document, persist the
    /// result to the backing file and open it in the editor.
    pub fn apply_all_changes(&self) -> Result<Vec<DiffChange>> {
        let manager = Arc::clone(&self.manager);
        let changes = self
            .event_loop
            .invoke_and_wait(move |token| manager.apply_all_changes(token))?;

        if changes.is_empty() {
            return Ok(changes);
        }

        if let Some(header) = self.header() {
            header.handle_changes_applied(&changes);
        }

        if let Some(file) = self.manager.virtual_file() {
            let text = self.viewer().document(Side::Left).read_text();
            file.write_text(&text)?;
            if let Some(open_file) = &self.open_file {
                open_file(file);
            }
        }

        Ok(changes)
    }

    /// Resync the view after external document changes: hop to a background
    /// worker, then marshal the actual rediff back onto the UI thread.
    pub fn refresh(&self) {
        let event_loop = Arc::clone(&self.event_loop);
        let viewer = Arc::clone(self.manager.viewer());
        self.worker_pool.execute(move || {
            event_loop.run_in_ui(move |token| {
                viewer.rediff(token, true);
            });
        });
    }

    fn header(&self) -> Option<Arc<DiffHeader>> {
        self.header
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
