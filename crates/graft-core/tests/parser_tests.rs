use graft_core::parser::{MessageParser, Segment};

// ========================================================================
// Streaming behavior across arbitrary chunk boundaries
// ========================================================================

const RESPONSE: &str = concat!(
    "Here is the fix:\n",
    "```rust:src/lib.rs\n",
    "<<<<<<< SEARCH\n",
    "fn broken() -> u32 { 0 }\n",
    "=======\n",
    "fn broken() -> u32 { 42 }\n",
    ">>>>>>> REPLACE\n",
    "```\n",
    "That should do it.\n",
);

fn completed_edits(segments: &[Segment]) -> Vec<(String, String)> {
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::SearchReplace { search, replace } => {
                Some((search.clone(), replace.clone()))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn single_delta_and_char_by_char_agree() {
    let mut whole = MessageParser::new();
    let whole_segments = whole.parse(RESPONSE);

    let mut chunked = MessageParser::new();
    let mut chunked_segments = Vec::new();
    for c in RESPONSE.chars() {
        chunked_segments.extend(chunked.parse(&c.to_string()));
    }

    assert_eq!(
        completed_edits(&whole_segments),
        completed_edits(&chunked_segments)
    );
    assert_eq!(
        completed_edits(&whole_segments),
        vec![(
            "fn broken() -> u32 { 0 }".to_string(),
            "fn broken() -> u32 { 42 }".to_string(),
        )]
    );
}

#[test]
fn replace_waiting_snapshots_grow_monotonically_here() {
    let mut parser = MessageParser::new();
    parser.parse("```rust:src/lib.rs\n<<<<<<< SEARCH\nold\n=======\n");

    let mut lengths = Vec::new();
    for delta in ["ne", "w li", "ne\n", "more\n"] {
        for segment in parser.parse(delta) {
            if let Segment::ReplaceWaiting { replace, .. } = segment {
                lengths.push(replace.len());
            }
        }
    }

    assert!(!lengths.is_empty());
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn prose_around_the_block_stays_text() {
    let mut parser = MessageParser::new();
    let segments = parser.parse(RESPONSE);

    let texts: Vec<&Segment> = segments
        .iter()
        .filter(|s| matches!(s, Segment::Text { .. }))
        .collect();
    assert!(texts
        .iter()
        .any(|s| matches!(s, Segment::Text { content } if content.contains("Here is the fix:"))));
    assert!(texts
        .iter()
        .any(|s| matches!(s, Segment::Text { content } if content.contains("That should do it."))));
}

#[test]
fn code_without_markers_is_a_plain_code_block() {
    let mut parser = MessageParser::new();
    let segments = parser.parse("```python:tool.py\nprint('hi')\n```\n");

    assert!(segments.iter().any(|s| matches!(
        s,
        Segment::Code { content, language, file_path }
            if content == "print('hi')"
                && language == "python"
                && file_path.as_deref() == Some("tool.py")
    )));
    assert!(segments.iter().any(|s| matches!(
        s,
        Segment::CodeEnd { language, .. } if language == "python"
    )));
    assert!(completed_edits(&segments).is_empty());
}

#[test]
fn clear_resets_all_parser_state() {
    let mut parser = MessageParser::new();
    parser.parse("```rust:a.rs\n<<<<<<< SEARCH\nabc\n");
    parser.clear();

    let segments = parser.parse("plain text\n");
    assert_eq!(
        segments,
        vec![Segment::Text {
            content: "plain text".to_string()
        }]
    );
}
