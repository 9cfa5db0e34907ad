use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use similar::{DiffOp, TextDiff};

use crate::diff::dispatch::UiToken;
use crate::diff::document::Document;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One contiguous hunk between the left (original) and right (proposed)
/// sides. Line ranges are zero-based and end-exclusive. Invalidated whenever
/// either side's text changes; always re-read after a rediff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffChange {
    pub start_line_left: usize,
    pub end_line_left: usize,
    pub start_line_right: usize,
    pub end_line_right: usize,
}

impl DiffChange {
    pub fn deleted_lines(&self) -> usize {
        self.end_line_left - self.start_line_left
    }

    pub fn inserted_lines(&self) -> usize {
        self.end_line_right - self.start_line_right
    }
}

/// Owns one left/right document pair for the lifetime of a single diff
/// render, plus the hunk list computed from them.
pub struct UnifiedDiffViewer {
    left: Document,
    right: Document,
    changes: Mutex<Vec<DiffChange>>,
    rediff_scheduled: AtomicBool,
    scroll_line: Mutex<Option<usize>>,
}

impl UnifiedDiffViewer {
    pub fn new(left: Document, right: Document) -> Self {
        let changes = compute_changes(&left.read_text(), &right.read_text());
        Self {
            left,
            right,
            changes: Mutex::new(changes),
            rediff_scheduled: AtomicBool::new(false),
            scroll_line: Mutex::new(None),
        }
    }

    pub fn document(&self, side: Side) -> &Document {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn diff_changes(&self) -> Vec<DiffChange> {
        self.changes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Full recomputation of the hunk list from the current texts. The
    /// `full_rescan` flag matches the viewer contract; both paths recompute
    /// from scratch here.
    pub fn rediff(&self, token: &UiToken, _full_rescan: bool) {
        token.verify();
        self.rediff_scheduled.store(false, Ordering::Release);
        let fresh = compute_changes(&self.left.read_text(), &self.right.read_text());
        let mut changes = self
            .changes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *changes = fresh;
    }

    /// Mark the hunk list stale without recomputing it yet.
    pub fn schedule_rediff(&self) {
        self.rediff_scheduled.store(true, Ordering::Release);
    }

    pub fn is_rediff_scheduled(&self) -> bool {
        self.rediff_scheduled.load(Ordering::Acquire)
    }

    /// Copy one hunk from `source` into the opposite side as a single
    /// undoable write command. Line numbers of later hunks shift; callers
    /// must rediff before touching another hunk.
    pub fn replace_change(
        &self,
        token: &UiToken,
        change: &DiffChange,
        source: Side,
    ) -> Result<()> {
        token.verify();
        let (source_doc, target_doc) = match source {
            Side::Right => (&self.right, &self.left),
            Side::Left => (&self.left, &self.right),
        };
        let (source_range, target_range) = match source {
            Side::Right => (
                change.start_line_right..change.end_line_right,
                change.start_line_left..change.end_line_left,
            ),
            Side::Left => (
                change.start_line_left..change.end_line_left,
                change.start_line_right..change.end_line_right,
            ),
        };

        let source_text = source_doc.read_text();
        let replacement: Vec<String> = source_text
            .lines()
            .skip(source_range.start)
            .take(source_range.end - source_range.start)
            .map(str::to_string)
            .collect();

        target_doc.execute_write_command(token, "Replace change", |text| {
            *text = replace_line_range(text, target_range.start, target_range.end, &replacement);
        })
    }

    pub fn scroll_to_line(&self, line: usize) {
        let mut scroll = self
            .scroll_line
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *scroll = Some(line);
    }

    pub fn scroll_position(&self) -> Option<usize> {
        *self
            .scroll_line
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn compute_changes(old: &str, new: &str) -> Vec<DiffChange> {
    let diff = TextDiff::from_lines(old, new);
    let mut changes = Vec::new();
    for op in diff.ops() {
        let change = match *op {
            DiffOp::Equal { .. } => continue,
            DiffOp::Delete {
                old_index,
                old_len,
                new_index,
            } => DiffChange {
                start_line_left: old_index,
                end_line_left: old_index + old_len,
                start_line_right: new_index,
                end_line_right: new_index,
            },
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => DiffChange {
                start_line_left: old_index,
                end_line_left: old_index,
                start_line_right: new_index,
                end_line_right: new_index + new_len,
            },
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => DiffChange {
                start_line_left: old_index,
                end_line_left: old_index + old_len,
                start_line_right: new_index,
                end_line_right: new_index + new_len,
            },
        };
        changes.push(change);
    }
    changes
}

fn replace_line_range(text: &str, start: usize, end: usize, replacement: &[String]) -> String {
    let had_trailing_newline = text.is_empty() || text.ends_with('\n');
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let start = start.min(lines.len());
    let end = end.clamp(start, lines.len());
    lines.splice(start..end, replacement.iter().cloned());
    let mut out = lines.join("\n");
    if had_trailing_newline && !out.is_empty() {
        out.push('\n');
    }
    out
}
