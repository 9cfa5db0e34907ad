use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use similar::{ChangeTag, TextDiff};

use graft_core::completions::{
    AutoApplyParams, ChatParams, CommitMessageParams, ReferencedFile, RequestFactory,
};
use graft_core::config::Settings;
use graft_core::conversation::{Conversation, ConversationMessage, ConversationStorage};
use graft_core::diff::{
    DiffEditorManager, DiffEditorState, DiffHeader, Document, EditorKind, EventLoop, HeaderConfig,
    Side, UnifiedDiffViewer, WorkerPool,
};
use graft_core::parser::{MessageParser, Segment};
use graft_core::vfs::{self, LocalFileSystem, VirtualFile};
use graft_core::StreamEvent;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// One live diff editor per file the response proposes edits for.
struct DiffSession {
    file: VirtualFile,
    viewer: Arc<UnifiedDiffViewer>,
    state: DiffEditorState,
    header: Arc<DiffHeader>,
}

/// Consumes parsed segments from a streaming response: prose goes to the
/// terminal, proposed edits go into per-file diff sessions.
struct ChatRenderer {
    event_loop: Arc<EventLoop>,
    worker_pool: Arc<WorkerPool>,
    sessions: HashMap<String, DiffSession>,
    current_file: Option<String>,
    new_file_content: HashMap<String, String>,
    printed_text: String,
}

impl ChatRenderer {
    fn new() -> Self {
        Self {
            event_loop: EventLoop::spawn(),
            worker_pool: WorkerPool::new(2),
            sessions: HashMap::new(),
            current_file: None,
            new_file_content: HashMap::new(),
            printed_text: String::new(),
        }
    }

    fn handle_segment(&mut self, segment: &Segment) {
        match segment {
            Segment::Text { content } => {
                // Segments are whole snapshots; print only what is new.
                if let Some(suffix) = content.strip_prefix(self.printed_text.as_str()) {
                    print!("{suffix}");
                } else {
                    print!("{content}");
                }
                let _ = std::io::stdout().flush();
                self.printed_text = content.clone();
            }
            Segment::Code {
                content, file_path, ..
            } => {
                // A new text segment starts after the block.
                self.printed_text.clear();
                if let Some(path) = file_path {
                    self.current_file = Some(path.clone());
                    if LocalFileSystem::resolve(path).is_none() {
                        self.new_file_content.insert(path.clone(), content.clone());
                    }
                }
            }
            Segment::CodeEnd {
                file_path: Some(path),
                ..
            } => {
                self.create_pending_file(path);
            }
            Segment::CodeEnd { .. } => {}
            Segment::SearchWaiting { .. } => {}
            Segment::SearchReplace { .. } | Segment::ReplaceWaiting { .. } => {
                let Some(path) = self.current_file.clone() else {
                    return;
                };
                if let Some(session) = self.session_for(&path) {
                    session.state.update_content(segment);
                }
            }
        }
    }

    fn session_for(&mut self, path: &str) -> Option<&DiffSession> {
        if !self.sessions.contains_key(path) {
            let session = open_diff_session(
                Arc::clone(&self.event_loop),
                Arc::clone(&self.worker_pool),
                path,
            )?;
            self.sessions.insert(path.to_string(), session);
        }
        self.sessions.get(path)
    }

    /// "Add file" flow for paths the response introduces: the whole code
    /// block becomes the new file's content.
    fn create_pending_file(&mut self, path: &str) {
        let Some(content) = self.new_file_content.remove(path) else {
            return;
        };
        if content.is_empty() || contains_edit_markers(&content) {
            return;
        }
        let header = DiffHeader::new(
            HeaderConfig {
                file_path: Some(path.to_string()),
                language: String::new(),
                read_only: false,
                loading: false,
            },
            Arc::clone(&self.event_loop),
            Some(Arc::new(|file: &VirtualFile| {
                println!("{DIM}created {}{RESET}", file.path().display());
            })),
        );
        header.create_new_file(&content);
    }

    /// Settle the event queue, then preview or apply every session.
    fn finish(&mut self, apply: bool) -> Result<()> {
        self.event_loop.flush();
        println!();

        for (path, session) in &self.sessions {
            let changes = session.viewer.diff_changes();
            if changes.is_empty() {
                continue;
            }

            // The header reconciled its label while the stream was running.
            println!("{BOLD}{path} {}{RESET}", session.header.stats_label());

            if apply {
                let applied = session
                    .state
                    .apply_all_changes()
                    .with_context(|| format!("failed to apply changes to {path}"))?;
                self.event_loop.flush();
                println!(
                    "{DIM}applied {} change{} to {}{RESET}",
                    applied.len(),
                    if applied.len() == 1 { "" } else { "s" },
                    session.file.name(),
                );
            } else {
                let left = session.viewer.document(Side::Left).read_text();
                let right = session.viewer.document(Side::Right).read_text();
                print_diff(&left, &right);
            }
        }

        Ok(())
    }
}

fn contains_edit_markers(content: &str) -> bool {
    content.contains("<<<<<<< SEARCH") || content.contains(">>>>>>> REPLACE")
}

fn open_diff_session(
    event_loop: Arc<EventLoop>,
    worker_pool: Arc<WorkerPool>,
    path: &str,
) -> Option<DiffSession> {
    let file = LocalFileSystem::resolve(path)?;
    let base_text = file.read_text().ok()?;

    let left = Document::new_read_only(&base_text);
    let right = Document::new(&base_text);
    let viewer = Arc::new(UnifiedDiffViewer::new(left, right));
    let manager = Arc::new(DiffEditorManager::new(
        Arc::clone(&event_loop),
        Arc::clone(&viewer),
        Some(file.clone()),
    ));

    let header = DiffHeader::new(
        HeaderConfig {
            file_path: Some(path.to_string()),
            language: vfs::util::language_for_extension(&vfs::util::file_extension(path))
                .unwrap_or_default(),
            read_only: false,
            loading: true,
        },
        Arc::clone(&event_loop),
        None,
    );

    let state = DiffEditorState::new(EditorKind::Diff, event_loop, worker_pool, manager)
        .with_open_file(Arc::new(|file: &VirtualFile| {
            println!("{DIM}opened {}{RESET}", file.path().display());
        }));
    state.set_header(Arc::clone(&header));

    Some(DiffSession {
        file,
        viewer,
        state,
        header,
    })
}

fn print_diff(left: &str, right: &str) {
    let diff = TextDiff::from_lines(left, right);
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => println!("{RED}-{line}{RESET}"),
            ChangeTag::Insert => println!("{GREEN}+{line}{RESET}"),
            ChangeTag::Equal => println!("{DIM} {line}{RESET}"),
        }
    }
}

/// Drive one streaming completion through the parser into the renderer.
/// Returns the full raw response text.
async fn stream_into_renderer(
    settings: &Settings,
    request: graft_core::CompletionRequest,
    renderer: &mut ChatRenderer,
) -> Result<String> {
    let client = settings.build_llm_client()?;
    let mut events = client.complete_stream(&request).await?;
    let mut parser = MessageParser::new();
    let mut response = String::new();

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TextDelta(delta) => {
                response.push_str(&delta);
                for segment in parser.parse(&delta) {
                    renderer.handle_segment(&segment);
                }
            }
            StreamEvent::Done => break,
            StreamEvent::Error(message) => bail!("stream failed: {message}"),
        }
    }

    Ok(response)
}

pub async fn run_chat(
    settings: &Settings,
    prompt: &str,
    files: &[String],
    image: Option<&str>,
    apply: bool,
) -> Result<()> {
    let referenced_files: Vec<ReferencedFile> = files
        .iter()
        .map(|path| ReferencedFile {
            path: path.clone(),
            content: vfs::util::read_content(path),
        })
        .collect();

    // The request carries the (empty) history; the prompt itself is added
    // by the factory, so it only enters the stored conversation.
    let mut conversation = Conversation::new();
    let history = conversation.clone();
    let exchange = ConversationMessage::new(prompt);
    let exchange_id = exchange.id;
    conversation.add_message(exchange);

    let factory = RequestFactory::for_settings(settings);
    let mut params = ChatParams::new(history, prompt).with_referenced_files(referenced_files);
    if let Some(image_path) = image {
        params = params
            .with_image_from_path(image_path)
            .with_context(|| format!("failed to attach {image_path}"))?;
    }
    let request = factory.create_chat_request(&params);

    let mut renderer = ChatRenderer::new();
    let response = stream_into_renderer(settings, request, &mut renderer).await?;

    conversation.set_response(exchange_id, response);
    if let Err(e) = ConversationStorage::default().save(&conversation) {
        tracing::warn!("failed to persist conversation: {e}");
    }

    renderer.finish(apply)
}

pub async fn run_auto_apply(
    settings: &Settings,
    source: &str,
    destination: &str,
    dry_run: bool,
) -> Result<()> {
    let source_text = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };

    let Some(destination_file) = LocalFileSystem::resolve(destination) else {
        bail!("destination file not found: {destination}");
    };

    let factory = RequestFactory::for_settings(settings);
    let request = factory.create_auto_apply_request(&AutoApplyParams {
        source: source_text,
        destination: destination_file,
    })?;

    let mut renderer = ChatRenderer::new();
    renderer.current_file = Some(destination.to_string());
    stream_into_renderer(settings, request, &mut renderer).await?;
    renderer.finish(!dry_run)
}

pub async fn run_commit_message(settings: &Settings) -> Result<()> {
    let mut git_diff = String::new();
    std::io::stdin().read_to_string(&mut git_diff)?;
    if git_diff.trim().is_empty() {
        bail!("no diff on stdin");
    }

    let factory = RequestFactory::for_settings(settings);
    let request = factory.create_commit_message_request(&CommitMessageParams {
        git_diff,
        system_prompt: settings.prompts.commit_message().to_string(),
    });

    let client = settings.build_llm_client()?;
    let mut events = client.complete_stream(&request).await?;

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TextDelta(delta) => {
                print!("{delta}");
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Done => break,
            StreamEvent::Error(message) => bail!("stream failed: {message}"),
        }
    }
    println!();

    Ok(())
}
