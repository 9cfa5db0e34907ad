use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use graft_core::diff::{
    DiffEditorManager, DiffEditorState, DiffHeader, Document, EditorKind, EventLoop,
    HeaderConfig, Side, UnifiedDiffViewer, WorkerPool,
};
use graft_core::parser::Segment;
use graft_core::vfs::{LocalFileSystem, VirtualFile};

// ========================================================================
// Fixtures
// ========================================================================

struct DiffFixture {
    _dir: TempDir,
    file: VirtualFile,
    event_loop: Arc<EventLoop>,
    viewer: Arc<UnifiedDiffViewer>,
    state: DiffEditorState,
}

fn diff_fixture(base_text: &str) -> DiffFixture {
    let dir = TempDir::new().unwrap();
    let file = LocalFileSystem::create_file(dir.path().join("target.rs"), base_text).unwrap();

    let event_loop = EventLoop::spawn();
    let worker_pool = WorkerPool::new(2);

    let left = Document::new_read_only(base_text);
    let right = Document::new(base_text);
    let viewer = Arc::new(UnifiedDiffViewer::new(left, right));
    let manager = Arc::new(DiffEditorManager::new(
        Arc::clone(&event_loop),
        Arc::clone(&viewer),
        Some(file.clone()),
    ));
    let state = DiffEditorState::new(
        EditorKind::Diff,
        Arc::clone(&event_loop),
        worker_pool,
        manager,
    );

    DiffFixture {
        _dir: dir,
        file,
        event_loop,
        viewer,
        state,
    }
}

fn search_replace(search: &str, replace: &str) -> Segment {
    Segment::SearchReplace {
        search: search.to_string(),
        replace: replace.to_string(),
    }
}

fn replace_waiting(search: &str, replace: &str) -> Segment {
    Segment::ReplaceWaiting {
        search: search.to_string(),
        replace: replace.to_string(),
    }
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ========================================================================
// Content updates (single search/replace segments)
// ========================================================================

#[test]
fn update_replaces_first_occurrence_and_rediffs() {
    let fixture = diff_fixture("foo\nbar\n");

    fixture.state.update_content(&search_replace("bar", "baz"));
    fixture.event_loop.flush();

    let right = fixture.viewer.document(Side::Right).read_text();
    assert_eq!(right, "foo\nbaz\n");

    let changes = fixture.viewer.diff_changes();
    assert_eq!(changes.len(), 1);
    // The view scrolled to the freshly changed hunk.
    assert_eq!(
        fixture.viewer.scroll_position(),
        Some(changes[0].start_line_right)
    );
}

#[test]
fn update_with_absent_search_is_a_silent_noop() {
    let fixture = diff_fixture("foo\nbar\n");

    let segment = search_replace("does-not-occur", "whatever");
    fixture.state.update_content(&segment);
    fixture.event_loop.flush();

    assert_eq!(
        fixture.viewer.document(Side::Right).read_text(),
        "foo\nbar\n"
    );
    assert!(fixture.viewer.diff_changes().is_empty());
    // No hunks means nothing to scroll to.
    assert_eq!(fixture.viewer.scroll_position(), None);
}

#[test]
fn update_trims_search_and_replace_text() {
    let fixture = diff_fixture("foo\nbar\n");

    fixture
        .state
        .update_content(&search_replace("  bar  ", "\nbaz\n"));
    fixture.event_loop.flush();

    assert_eq!(
        fixture.viewer.document(Side::Right).read_text(),
        "foo\nbaz\n"
    );
}

#[test]
fn update_without_backing_file_reports_failure() {
    let event_loop = EventLoop::spawn();
    let viewer = Arc::new(UnifiedDiffViewer::new(
        Document::new("a\n"),
        Document::new("a\n"),
    ));
    let manager = DiffEditorManager::new(Arc::clone(&event_loop), viewer, None);

    assert!(!manager.update_diff_content("a", "b"));
}

#[test]
fn streaming_replace_converges_through_partial_states() {
    let fixture = diff_fixture("foo\nbar\n");

    // Partial replace text arrives first and is visible in the view.
    fixture.state.update_content(&replace_waiting("bar", "ba"));
    fixture.event_loop.flush();
    assert_eq!(
        fixture.viewer.document(Side::Right).read_text(),
        "foo\nba\n"
    );

    // The complete segment supersedes it.
    fixture.state.update_content(&search_replace("bar", "baz"));
    fixture.event_loop.flush();
    assert_eq!(
        fixture.viewer.document(Side::Right).read_text(),
        "foo\nbaz\n"
    );
    assert_eq!(fixture.viewer.diff_changes().len(), 1);
}

#[test]
fn streaming_replace_may_regress() {
    // The engine does not guard against replace text shrinking between
    // segments; the latest segment wins.
    let fixture = diff_fixture("foo\nbar\n");

    fixture.state.update_content(&replace_waiting("bar", "baz"));
    fixture.event_loop.flush();
    fixture.state.update_content(&replace_waiting("bar", "ba"));
    fixture.event_loop.flush();

    assert_eq!(
        fixture.viewer.document(Side::Right).read_text(),
        "foo\nba\n"
    );
}

#[test]
fn non_diff_editor_ignores_segments() {
    let dir = TempDir::new().unwrap();
    let file = LocalFileSystem::create_file(dir.path().join("t.rs"), "foo\n").unwrap();
    let event_loop = EventLoop::spawn();
    let viewer = Arc::new(UnifiedDiffViewer::new(
        Document::new("foo\n"),
        Document::new("foo\n"),
    ));
    let manager = Arc::new(DiffEditorManager::new(
        Arc::clone(&event_loop),
        Arc::clone(&viewer),
        Some(file),
    ));
    let state = DiffEditorState::new(
        EditorKind::Standard,
        Arc::clone(&event_loop),
        WorkerPool::new(1),
        manager,
    );

    state.update_content(&search_replace("foo", "qux"));
    event_loop.flush();

    assert_eq!(viewer.document(Side::Right).read_text(), "foo\n");
}

// ========================================================================
// Bulk apply
// ========================================================================

#[test]
fn apply_all_drains_every_hunk_in_order() {
    let fixture = diff_fixture("a\nb\nc\nd\ne\n");

    // Two disjoint hunks: b -> B and d -> D.
    fixture.event_loop.invoke_and_wait({
        let viewer = Arc::clone(&fixture.viewer);
        move |token| {
            viewer
                .document(Side::Right)
                .replace_content(token, "a\nB\nc\nD\ne\n");
            viewer.rediff(token, true);
        }
    });
    assert_eq!(fixture.viewer.diff_changes().len(), 2);

    let applied = fixture.state.apply_all_changes().unwrap();
    assert_eq!(applied.len(), 2);
    assert!(applied[0].start_line_left <= applied[1].start_line_left);

    assert!(fixture.viewer.diff_changes().is_empty());
    assert_eq!(
        fixture.viewer.document(Side::Left).read_text(),
        "a\nB\nc\nD\ne\n"
    );
    // The result was persisted to the backing file.
    assert_eq!(fixture.file.read_text().unwrap(), "a\nB\nc\nD\ne\n");
}

#[test]
fn apply_all_on_clean_diff_is_a_noop() {
    let fixture = diff_fixture("a\nb\n");

    let applied = fixture.state.apply_all_changes().unwrap();
    assert!(applied.is_empty());

    // No mutation happened: no undoable commands were recorded and the
    // file is untouched.
    assert_eq!(fixture.viewer.document(Side::Left).undo_depth(), 0);
    assert_eq!(fixture.file.read_text().unwrap(), "a\nb\n");
}

#[test]
fn apply_all_forces_read_only_documents_writable() {
    let fixture = diff_fixture("x\ny\n");
    assert!(!fixture.viewer.document(Side::Left).is_writable());

    fixture.state.update_content(&search_replace("y", "z"));
    fixture.event_loop.flush();

    let applied = fixture.state.apply_all_changes().unwrap();
    assert_eq!(applied.len(), 1);
    assert!(fixture.viewer.document(Side::Left).is_writable());
    assert_eq!(fixture.viewer.document(Side::Left).read_text(), "x\nz\n");
}

#[test]
fn apply_all_records_one_undo_unit_per_hunk() {
    let fixture = diff_fixture("a\nb\nc\nd\ne\n");

    fixture.event_loop.invoke_and_wait({
        let viewer = Arc::clone(&fixture.viewer);
        move |token| {
            viewer
                .document(Side::Right)
                .replace_content(token, "a\nB\nc\nD\ne\n");
            viewer.rediff(token, true);
        }
    });

    fixture.state.apply_all_changes().unwrap();
    let left = fixture.viewer.document(Side::Left).clone();
    assert_eq!(left.undo_depth(), 2);

    // Undoing one unit rolls back only the most recent hunk.
    fixture.event_loop.invoke_and_wait({
        let left = left.clone();
        move |token| left.undo_last(token)
    });
    assert_eq!(left.read_text(), "a\nB\nc\nd\ne\n");
}

#[test]
fn apply_all_handles_insertions_and_deletions() {
    let fixture = diff_fixture("one\ntwo\nthree\n");

    fixture.event_loop.invoke_and_wait({
        let viewer = Arc::clone(&fixture.viewer);
        move |token| {
            // Delete "two", append "four" - one pure deletion, one pure
            // insertion.
            viewer
                .document(Side::Right)
                .replace_content(token, "one\nthree\nfour\n");
            viewer.rediff(token, true);
        }
    });

    let applied = fixture.state.apply_all_changes().unwrap();
    assert_eq!(applied.len(), 2);
    assert_eq!(
        fixture.viewer.document(Side::Left).read_text(),
        "one\nthree\nfour\n"
    );
    assert!(fixture.viewer.diff_changes().is_empty());
}

// ========================================================================
// Header and stats reconciliation
// ========================================================================

#[test]
fn header_receives_fresh_stats_after_update() {
    let fixture = diff_fixture("foo\nbar\n");

    let header = DiffHeader::new(
        HeaderConfig {
            file_path: Some(fixture.file.path().display().to_string()),
            language: "Rust".to_string(),
            read_only: false,
            loading: false,
        },
        Arc::clone(&fixture.event_loop),
        None,
    );
    fixture.state.set_header(Arc::clone(&header));

    fixture.state.update_content(&search_replace("bar", "baz"));
    fixture.event_loop.flush();

    assert_eq!(header.stats_label(), "+1 -1");

    // Re-running the reconciliation with the same hunk list renders the
    // same label.
    header.update_diff_stats(fixture.viewer.diff_changes());
    fixture.event_loop.flush();
    assert_eq!(header.stats_label(), "+1 -1");
}

#[test]
fn header_clears_stats_once_changes_are_applied() {
    let fixture = diff_fixture("foo\nbar\n");

    let header = DiffHeader::new(
        HeaderConfig {
            file_path: Some(fixture.file.path().display().to_string()),
            language: "Rust".to_string(),
            read_only: false,
            loading: false,
        },
        Arc::clone(&fixture.event_loop),
        None,
    );
    fixture.state.set_header(Arc::clone(&header));

    fixture.state.update_content(&search_replace("bar", "baz"));
    fixture.event_loop.flush();

    let applied = fixture.state.apply_all_changes().unwrap();
    fixture.event_loop.flush();

    assert_eq!(header.applied_count(), Some(applied.len()));
    assert_eq!(header.stats_label(), "");
}

#[test]
fn header_link_reflects_file_presence() {
    use graft_core::diff::HeaderLink;

    let dir = TempDir::new().unwrap();
    let event_loop = EventLoop::spawn();

    // No path at all: plain language label.
    let header = DiffHeader::new(
        HeaderConfig {
            file_path: None,
            language: "Rust".to_string(),
            read_only: false,
            loading: false,
        },
        Arc::clone(&event_loop),
        None,
    );
    assert_eq!(header.link(), HeaderLink::Language("Rust".to_string()));

    // Path without a file yet: "add file" link; creating the file swaps
    // it for a regular file link.
    let new_path = dir.path().join("nested").join("fresh.rs");
    let header = DiffHeader::new(
        HeaderConfig {
            file_path: Some(new_path.display().to_string()),
            language: "Rust".to_string(),
            read_only: false,
            loading: false,
        },
        Arc::clone(&event_loop),
        None,
    );
    assert_eq!(header.link(), HeaderLink::NewFile("fresh.rs".to_string()));

    let created = header.create_new_file("fn fresh() {}\n").unwrap();
    assert_eq!(created.read_text().unwrap(), "fn fresh() {}\n");
    assert_eq!(header.link(), HeaderLink::File("fresh.rs".to_string()));

    // Creating again fails (the file exists) and is reported as a no-op.
    assert!(header.create_new_file("other").is_none());
}

#[test]
fn stats_listener_observes_reconciliation() {
    use std::sync::Mutex;

    let fixture = diff_fixture("foo\nbar\n");
    let header = DiffHeader::new(
        HeaderConfig {
            file_path: Some(fixture.file.path().display().to_string()),
            language: "Rust".to_string(),
            read_only: false,
            loading: false,
        },
        Arc::clone(&fixture.event_loop),
        None,
    );

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    header.set_stats_listener(Box::new(move |_stats, label| {
        sink.lock().unwrap().push(label.to_string());
    }));
    fixture.state.set_header(Arc::clone(&header));

    fixture.state.update_content(&search_replace("bar", "baz"));
    fixture.event_loop.flush();

    assert_eq!(seen.lock().unwrap().as_slice(), ["+1 -1".to_string()]);
}

// ========================================================================
// Refresh
// ========================================================================

#[test]
fn refresh_resyncs_after_external_document_change() {
    let fixture = diff_fixture("foo\nbar\n");

    // Mutate the right side without triggering a rediff.
    fixture.event_loop.invoke_and_wait({
        let viewer = Arc::clone(&fixture.viewer);
        move |token| {
            viewer
                .document(Side::Right)
                .replace_content(token, "foo\nqux\n");
        }
    });
    assert!(fixture.viewer.diff_changes().is_empty());

    fixture.state.refresh();

    let viewer = Arc::clone(&fixture.viewer);
    assert!(wait_until(Duration::from_secs(2), move || {
        viewer.diff_changes().len() == 1
    }));
}
