use std::sync::Arc;

use crate::diff::dispatch::{EventLoop, UiToken};
use crate::diff::viewer::{DiffChange, Side, UnifiedDiffViewer};
use crate::error::{GraftError, Result};
use crate::vfs::VirtualFile;

/// Applies streamed search/replace content onto the right side of a diff
/// viewer and drains the hunk list into the left side on "apply all".
pub struct DiffEditorManager {
    event_loop: Arc<EventLoop>,
    viewer: Arc<UnifiedDiffViewer>,
    virtual_file: Option<VirtualFile>,
}

impl DiffEditorManager {
    pub fn new(
        event_loop: Arc<EventLoop>,
        viewer: Arc<UnifiedDiffViewer>,
        virtual_file: Option<VirtualFile>,
    ) -> Self {
        Self {
            event_loop,
            viewer,
            virtual_file,
        }
    }

    pub fn viewer(&self) -> &Arc<UnifiedDiffViewer> {
        &self.viewer
    }

    pub fn virtual_file(&self) -> Option<&VirtualFile> {
        self.virtual_file.as_ref()
    }

    /// Substitute the first occurrence of `search` (trimmed) with `replace`
    /// (trimmed) in the backing file's current text and show the result on
    /// the right diff side. Returns `false` when no backing file content is
    /// available. A search text that does not occur leaves the text
    /// unchanged and still counts as success.
    ///
    /// The document mutation, rediff and scroll are scheduled on the UI
    /// thread; this call returns before they run.
    pub fn update_diff_content(&self, search: &str, replace: &str) -> bool {
        let current_text = match &self.virtual_file {
            Some(file) => match file.read_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("failed to read {}: {e}", file.name());
                    return false;
                }
            },
            None => return false,
        };

        let new_text = current_text.replacen(search.trim(), replace.trim(), 1);
        let viewer = Arc::clone(&self.viewer);
        self.event_loop.run_in_ui(move |token| {
            viewer.document(Side::Right).replace_content(token, &new_text);
            viewer.rediff(token, true);
            scroll_to_last_change(&viewer);
        });
        true
    }

    /// Apply every outstanding hunk from the right side into the left
    /// document, one undoable write command per hunk. Must run on the UI
    /// thread. Returns the hunks in the order they were applied.
    ///
    /// The loop is bounded by the hunk count at loop start; a pass that
    /// fails to drain the list is an invariant violation of the diff
    /// engine, not something to spin on.
    pub fn apply_all_changes(&self, token: &UiToken) -> Result<Vec<DiffChange>> {
        let document = self.viewer.document(Side::Left);
        document.ensure_writable(token);

        let starting_hunks = self.viewer.diff_changes().len();
        let mut applied = Vec::with_capacity(starting_hunks);

        for _ in 0..starting_hunks {
            let Some(change) = self.viewer.diff_changes().first().cloned() else {
                break;
            };

            self.viewer.replace_change(token, &change, Side::Right)?;
            self.viewer.schedule_rediff();
            self.viewer.rediff(token, true);

            applied.push(change);
        }

        if !self.viewer.diff_changes().is_empty() {
            return Err(GraftError::ApplyStalled(starting_hunks));
        }

        Ok(applied)
    }
}

fn scroll_to_last_change(viewer: &UnifiedDiffViewer) {
    let Some(change) = viewer.diff_changes().last().cloned() else {
        return;
    };
    viewer.scroll_to_line(change.start_line_right);
}
