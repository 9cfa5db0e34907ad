use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::diff::dispatch::EventLoop;
use crate::diff::stats::DiffStats;
use crate::diff::viewer::DiffChange;
use crate::vfs::{LocalFileSystem, OpenFileCallback, VirtualFile};

#[derive(Debug, Clone)]
pub struct HeaderConfig {
    pub file_path: Option<String>,
    pub language: String,
    pub read_only: bool,
    pub loading: bool,
}

/// What the header currently shows on its left edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLink {
    /// Link to an existing file the diff targets.
    File(String),
    /// "Add <name>" link for a file that does not exist yet.
    NewFile(String),
    /// Plain language label when there is no path at all.
    Language(String),
}

pub type StatsListener = Box<dyn Fn(DiffStats, &str) + Send + 'static>;

struct HeaderState {
    virtual_file: Option<VirtualFile>,
    stats: DiffStats,
    stats_label: String,
    applied_count: Option<usize>,
    listener: Option<StatsListener>,
}

/// Headless model of the diff editor's header: file link or language label
/// on the left, the compact `+N -M` stats next to it. UI layers observe it
/// through an explicitly registered listener rather than reaching back into
/// the component tree.
pub struct DiffHeader {
    config: HeaderConfig,
    event_loop: Arc<EventLoop>,
    state: Mutex<HeaderState>,
    open_file: Option<OpenFileCallback>,
}

impl DiffHeader {
    pub fn new(
        config: HeaderConfig,
        event_loop: Arc<EventLoop>,
        open_file: Option<OpenFileCallback>,
    ) -> Arc<Self> {
        let virtual_file = config
            .file_path
            .as_deref()
            .and_then(LocalFileSystem::resolve);
        Arc::new(Self {
            config,
            event_loop,
            state: Mutex::new(HeaderState {
                virtual_file,
                stats: DiffStats::default(),
                stats_label: String::new(),
                applied_count: None,
                listener: None,
            }),
            open_file,
        })
    }

    pub fn set_stats_listener(&self, listener: StatsListener) {
        self.with_state(|state| state.listener = Some(listener));
    }

    pub fn virtual_file(&self) -> Option<VirtualFile> {
        self.with_state(|state| state.virtual_file.clone())
    }

    pub fn link(&self) -> HeaderLink {
        match (&self.config.file_path, self.virtual_file()) {
            (None, _) => HeaderLink::Language(self.config.language.clone()),
            (Some(_), Some(file)) => HeaderLink::File(file.name()),
            (Some(path), None) => {
                let name = PathBuf::from(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.clone());
                HeaderLink::NewFile(name)
            }
        }
    }

    pub fn stats_label(&self) -> String {
        self.with_state(|state| state.stats_label.clone())
    }

    pub fn applied_count(&self) -> Option<usize> {
        self.with_state(|state| state.applied_count)
    }

    /// Recompute and re-render the stats label from a hunk list. The render
    /// itself runs on the UI thread.
    pub fn update_diff_stats(self: &Arc<Self>, changes: Vec<DiffChange>) {
        let header = Arc::clone(self);
        self.event_loop.run_in_ui(move |_token| {
            header.reconcile_stats(&changes);
        });
    }

    /// The render itself; callers must already be on the UI thread.
    pub(crate) fn reconcile_stats(&self, changes: &[DiffChange]) {
        let stats = DiffStats::from_changes(changes);
        let label = stats.render();
        self.with_state(|state| {
            state.stats = stats;
            state.stats_label = label.clone();
            if let Some(listener) = &state.listener {
                listener(stats, &label);
            }
        });
    }

    /// Called after a successful bulk apply.
    pub fn handle_changes_applied(self: &Arc<Self>, changes: &[DiffChange]) {
        let count = changes.len();
        let header = Arc::clone(self);
        self.event_loop.run_in_ui(move |_token| {
            header.with_state(|state| {
                state.applied_count = Some(count);
                state.stats = DiffStats::default();
                state.stats_label = String::new();
                if let Some(listener) = &state.listener {
                    listener(DiffStats::default(), "");
                }
            });
        });
    }

    /// "Add <file>" flow: create parent directories and the file, write the
    /// proposed text, swap the add-link for a file link and open the file.
    /// Creation failure is logged and aborts the flow.
    pub fn create_new_file(&self, content: &str) -> Option<VirtualFile> {
        let path = self.config.file_path.as_deref()?;
        let file = match LocalFileSystem::create_file(path, content) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("failed to create {path}: {e}");
                return None;
            }
        };

        self.with_state(|state| state.virtual_file = Some(file.clone()));
        if let Some(open_file) = &self.open_file {
            open_file(&file);
        }
        Some(file)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut HeaderState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }
}
