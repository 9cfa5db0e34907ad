//! Streaming parser for model responses. Feeds of arbitrary text deltas are
//! split into [`Segment`]s: prose, fenced code, and search/replace edit
//! blocks. Segments are immutable snapshots; each delta re-emits the
//! current segment wholesale as its content grows.

const FENCE: &str = "```";
const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
const SEPARATOR_MARKER: &str = "=======";
const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

/// One parsed unit of a streamed model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Prose outside any code fence.
    Text { content: String },
    /// Inside a fenced code block, content still streaming.
    Code {
        content: String,
        language: String,
        file_path: Option<String>,
    },
    /// A code fence just closed.
    CodeEnd {
        language: String,
        file_path: Option<String>,
    },
    /// Inside a `<<<<<<< SEARCH` block, search text still streaming.
    SearchWaiting { search: String },
    /// Past `=======`, replace text still streaming and may grow.
    ReplaceWaiting { search: String, replace: String },
    /// A complete proposed edit, closed by `>>>>>>> REPLACE`.
    SearchReplace { search: String, replace: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Outside,
    InCode,
    InSearch,
    InReplace,
}

/// Incremental state machine over streamed response text. Complete lines
/// are committed; a trailing partial line is only surfaced in snapshots
/// once it can no longer turn into a marker.
pub struct MessageParser {
    state: ParserState,
    pending: String,
    text: String,
    language: String,
    file_path: Option<String>,
    code: String,
    search: String,
    replace: String,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Outside,
            pending: String::new(),
            text: String::new(),
            language: String::new(),
            file_path: None,
            code: String::new(),
            search: String::new(),
            replace: String::new(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Consume one streamed delta and return the segments it produced:
    /// completed segments for every state transition, followed by a
    /// snapshot of the still-streaming segment.
    pub fn parse(&mut self, delta: &str) -> Vec<Segment> {
        self.pending.push_str(delta);

        let mut segments = Vec::new();
        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending[..newline].to_string();
            self.pending.drain(..=newline);
            self.handle_line(line.trim_end_matches('\r'), &mut segments);
        }

        if let Some(snapshot) = self.snapshot() {
            segments.push(snapshot);
        }
        segments
    }

    fn handle_line(&mut self, line: &str, segments: &mut Vec<Segment>) {
        match self.state {
            ParserState::Outside => {
                if let Some(rest) = line.trim_start().strip_prefix(FENCE) {
                    if !self.text.is_empty() {
                        segments.push(Segment::Text {
                            content: self.text.clone(),
                        });
                        self.text.clear();
                    }
                    let (language, file_path) = parse_fence_header(rest);
                    self.language = language;
                    self.file_path = file_path;
                    self.code.clear();
                    self.state = ParserState::InCode;
                } else {
                    push_line(&mut self.text, line);
                }
            }
            ParserState::InCode => {
                if line.trim() == SEARCH_MARKER {
                    self.search.clear();
                    self.replace.clear();
                    self.state = ParserState::InSearch;
                } else if line.trim() == FENCE {
                    // Emit the finished block content once so consumers see
                    // it even when the whole block arrived in one delta.
                    if !self.code.is_empty() {
                        segments.push(Segment::Code {
                            content: self.code.clone(),
                            language: self.language.clone(),
                            file_path: self.file_path.clone(),
                        });
                    }
                    segments.push(Segment::CodeEnd {
                        language: self.language.clone(),
                        file_path: self.file_path.clone(),
                    });
                    self.code.clear();
                    self.state = ParserState::Outside;
                } else {
                    push_line(&mut self.code, line);
                }
            }
            ParserState::InSearch => {
                if line.trim() == SEPARATOR_MARKER {
                    self.state = ParserState::InReplace;
                } else {
                    push_line(&mut self.search, line);
                }
            }
            ParserState::InReplace => {
                if line.trim() == REPLACE_MARKER {
                    segments.push(Segment::SearchReplace {
                        search: self.search.clone(),
                        replace: self.replace.clone(),
                    });
                    self.search.clear();
                    self.replace.clear();
                    self.state = ParserState::InCode;
                } else if line.trim() == FENCE {
                    // Stream closed the fence mid-edit; finish with what we
                    // have rather than dropping the edit.
                    segments.push(Segment::SearchReplace {
                        search: self.search.clone(),
                        replace: self.replace.clone(),
                    });
                    segments.push(Segment::CodeEnd {
                        language: self.language.clone(),
                        file_path: self.file_path.clone(),
                    });
                    self.search.clear();
                    self.replace.clear();
                    self.code.clear();
                    self.state = ParserState::Outside;
                } else {
                    push_line(&mut self.replace, line);
                }
            }
        }
    }

    /// Snapshot of the in-flight segment, including the trailing partial
    /// line unless it could still become a marker.
    fn snapshot(&self) -> Option<Segment> {
        let partial = self.visible_partial();
        match self.state {
            ParserState::Outside => {
                let content = join_partial(&self.text, partial);
                if content.is_empty() {
                    None
                } else {
                    Some(Segment::Text { content })
                }
            }
            ParserState::InCode => Some(Segment::Code {
                content: join_partial(&self.code, partial),
                language: self.language.clone(),
                file_path: self.file_path.clone(),
            }),
            ParserState::InSearch => Some(Segment::SearchWaiting {
                search: join_partial(&self.search, partial),
            }),
            ParserState::InReplace => Some(Segment::ReplaceWaiting {
                search: self.search.clone(),
                replace: join_partial(&self.replace, partial),
            }),
        }
    }

    fn visible_partial(&self) -> Option<&str> {
        if self.pending.is_empty() {
            return None;
        }
        let markers: &[&str] = match self.state {
            ParserState::Outside => &[FENCE],
            ParserState::InCode => &[FENCE, SEARCH_MARKER],
            ParserState::InSearch => &[SEPARATOR_MARKER],
            ParserState::InReplace => &[REPLACE_MARKER, FENCE],
        };
        let trimmed = self.pending.trim_start();
        if markers.iter().any(|m| m.starts_with(trimmed)) {
            return None;
        }
        // A fence header matches by prefix ("```lang:path"), so a partial
        // line that already starts with the fence is certain to open a
        // block once it completes.
        if self.state == ParserState::Outside && trimmed.starts_with(FENCE) {
            return None;
        }
        Some(self.pending.as_str())
    }
}

fn parse_fence_header(rest: &str) -> (String, Option<String>) {
    let rest = rest.trim();
    match rest.split_once(':') {
        Some((language, path)) => {
            let path = path.trim();
            (
                language.trim().to_string(),
                (!path.is_empty()).then(|| path.to_string()),
            )
        }
        None => (rest.to_string(), None),
    }
}

fn push_line(buffer: &mut String, line: &str) {
    if !buffer.is_empty() {
        buffer.push('\n');
    }
    buffer.push_str(line);
}

fn join_partial(buffer: &str, partial: Option<&str>) -> String {
    match partial {
        None => buffer.to_string(),
        Some(partial) if buffer.is_empty() => partial.to_string(),
        Some(partial) => format!("{buffer}\n{partial}"),
    }
}
