use std::sync::{Arc, Mutex, MutexGuard};

use crate::diff::dispatch::UiToken;
use crate::error::{GraftError, Result};

struct UndoEntry {
    label: String,
    before: String,
}

struct DocumentState {
    text: String,
    writable: bool,
    undo: Vec<UndoEntry>,
}

/// A shared editable text buffer. Reads are allowed from any thread; every
/// mutation requires a [`UiToken`] and is recorded as one undoable write
/// command.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentState>>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_writable(text, true)
    }

    pub fn new_read_only(text: impl Into<String>) -> Self {
        Self::with_writable(text, false)
    }

    fn with_writable(text: impl Into<String>, writable: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DocumentState {
                text: text.into(),
                writable,
                undo: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read_text(&self) -> String {
        self.lock().text.clone()
    }

    pub fn is_writable(&self) -> bool {
        self.lock().writable
    }

    /// Platform-level unlock of a read-only document. Deliberately
    /// irreversible from the engine's point of view.
    pub fn force_writable(&self, token: &UiToken) {
        token.verify();
        self.lock().writable = true;
    }

    /// Run one undoable write command against the buffer.
    pub fn execute_write_command(
        &self,
        token: &UiToken,
        label: &str,
        command: impl FnOnce(&mut String),
    ) -> Result<()> {
        token.verify();
        let mut state = self.lock();
        if !state.writable {
            return Err(GraftError::diff(format!(
                "document is not writable for command '{label}'"
            )));
        }
        let before = state.text.clone();
        command(&mut state.text);
        state.undo.push(UndoEntry {
            label: label.to_string(),
            before,
        });
        Ok(())
    }

    /// Replace the whole buffer, forcing the document writable first.
    pub fn replace_content(&self, token: &UiToken, text: &str) {
        self.ensure_writable(token);
        // Cannot fail once the document is writable.
        let _ = self.execute_write_command(token, "Updating document", |current| {
            current.clear();
            current.push_str(text);
        });
    }

    pub fn ensure_writable(&self, token: &UiToken) {
        if !self.is_writable() {
            self.force_writable(token);
        }
    }

    /// Undo the most recent write command. Returns the undone command's
    /// label, or `None` if there is nothing to undo.
    pub fn undo_last(&self, token: &UiToken) -> Option<String> {
        token.verify();
        let mut state = self.lock();
        let entry = state.undo.pop()?;
        state.text = entry.before;
        Some(entry.label)
    }

    pub fn undo_depth(&self) -> usize {
        self.lock().undo.len()
    }
}
