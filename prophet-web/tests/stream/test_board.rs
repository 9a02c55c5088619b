//! Board reconstruction from a streamed run

use super::common::*;
use prophet_web::MessageKind;
use prophet_web_sdk::{BoardEntry, BoardSource, Sentiment};
use serde_json::json;
use std::collections::BTreeMap;

fn ids(entries: &[BoardEntry]) -> Vec<i64> {
    entries.iter().map(|e| e.id).collect()
}

#[tokio::test]
async fn test_add_source_resolved_from_output_text() {
    let orch = run_to_end(vec![
        search("q", json!([{"id": "R3", "title": "A", "url": "u", "snippet": "s"}])),
        add_source("r3", "", "added as #7"),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert_eq!(
        orch.board(),
        &[BoardEntry {
            id: 7,
            source: BoardSource {
                title: "A".to_string(),
                url: "u".to_string(),
                snippet: "s".to_string(),
            },
            note: String::new(),
            reaction: BTreeMap::new(),
        }]
    );
}

#[tokio::test]
async fn test_repeated_id_keeps_last_add_and_latest_note() {
    let orch = run_to_end(vec![
        search("q", json!([source("a1", "First"), source("b2", "Second")])),
        add_source("a1", "first note", "added as #3"),
        edit_note(3, "revised"),
        add_source("B2", "second note", "Source #3 replaced"),
        edit_note(3, "final"),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert_eq!(orch.board().len(), 1);
    let entry = orch.board_entry(3).unwrap();
    assert_eq!(entry.source.title, "Second");
    assert_eq!(entry.note, "final");
}

#[tokio::test]
async fn test_board_sorted_by_id() {
    let orch = run_to_end(vec![
        search("q", json!([source("a", "A"), source("b", "B"), source("c", "C")])),
        add_source("a", "", "added as #5"),
        add_source("b", "", "added as #2"),
        add_source("c", "", "added as #9"),
        add_source("a", "", "added as #2"),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert_eq!(ids(orch.board()), vec![2, 5, 9]);
    assert_eq!(orch.board_entry(2).unwrap().source.title, "A");
}

#[tokio::test]
async fn test_structured_board_id_preferred() {
    let orch = run_to_end(vec![
        search("q", json!([source("a", "A")])),
        frame(json!({
            "type": "observation",
            "tool": "add_source",
            "error": false,
            "output_text": "see #99",
            "source_id": "a",
            "note": "",
            "board_id": 4,
        })),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert_eq!(ids(orch.board()), vec![4]);
}

#[tokio::test]
async fn test_unresolvable_add_source_still_reported() {
    let orch = run_to_end(vec![
        search("q", json!([source("a", "A")])),
        add_source("a", "no id here", "Source added"),
        add_source("zzz", "unknown source", "added as #2"),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert!(orch.board().is_empty());
    let placements: Vec<Option<i64>> = orch
        .transcript()
        .iter()
        .filter_map(|m| match &m.kind {
            MessageKind::AddSource { board_id, .. } => Some(*board_id),
            _ => None,
        })
        .collect();
    assert_eq!(placements, vec![None, Some(2)]);
}

#[tokio::test]
async fn test_error_flagged_observations_skip_mutation() {
    let orch = run_to_end(vec![
        frame(json!({
            "type": "observation",
            "tool": "search",
            "error": true,
            "output_text": "rate limited",
            "query": "q",
            "search_results": [source("a", "A")],
        })),
        search("q2", json!([source("b", "B")])),
        frame(json!({
            "type": "observation",
            "tool": "add_source",
            "error": true,
            "output_text": "added as #1",
            "source_id": "b",
            "note": "",
        })),
        add_source("b", "kept", "added as #2"),
        frame(json!({
            "type": "observation",
            "tool": "edit_note",
            "error": true,
            "output_text": "",
            "board_id": 2,
            "new_note": "ignored",
        })),
        edit_note(8, "no such entry"),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert_eq!(orch.search_groups().len(), 2);
    assert!(orch.registry().lookup("a").is_none());
    assert_eq!(ids(orch.board()), vec![2]);
    assert_eq!(orch.board_entry(2).unwrap().note, "kept");

    let tags: Vec<_> = orch.transcript().iter().map(|m| m.kind.tag()).collect();
    assert_eq!(
        tags,
        vec![
            "divider", "search", "search", "add_source", "add_source", "edit_note", "edit_note",
            "result"
        ]
    );
}

#[tokio::test]
async fn test_snapshot_replaces_incremental_board() {
    let snapshot = json!([
        {"id": 2, "source": {"title": "Final B", "url": "ub", "snippet": "sb"},
         "note": "server note", "reaction": {"Yes": "positive", "No": "very_negative"}},
        {"id": 11, "source": {"title": "Final K", "url": "uk", "snippet": "sk"},
         "note": "", "reaction": {"Yes": "mixed"}},
    ]);
    let orch = run_to_end(vec![
        search("q", json!([source("a", "A"), source("b", "B")])),
        add_source("a", "client note", "added as #1"),
        add_source("b", "client note", "added as #2"),
        edit_note(2, "client edit"),
        run_end("submitted", json!({"Yes": 0.6, "No": 0.4}), snapshot.clone()),
    ])
    .await;

    let expected: Vec<BoardEntry> = serde_json::from_value(snapshot).unwrap();
    assert_eq!(orch.board(), expected.as_slice());
    assert_eq!(
        orch.board_entry(2).unwrap().reaction.get("No"),
        Some(&Sentiment::VeryNegative)
    );
    assert_eq!(
        orch.board_entry(11).unwrap().reaction.get("Yes"),
        Some(&Sentiment::Other("mixed".to_string()))
    );

    let MessageKind::Result { board, .. } = &orch.transcript().last().unwrap().kind else {
        panic!("expected result message");
    };
    assert_eq!(board, &expected);
}

#[tokio::test]
async fn test_empty_snapshot_keeps_incremental_board() {
    let orch = run_to_end(vec![
        search("q", json!([source("a", "A")])),
        add_source("a", "client note", "added as #1"),
        run_end("step_limit", json!({}), json!([])),
    ])
    .await;

    assert_eq!(ids(orch.board()), vec![1]);
    let MessageKind::Result { board, .. } = &orch.transcript().last().unwrap().kind else {
        panic!("expected result message");
    };
    assert_eq!(ids(board), vec![1]);
}

#[tokio::test]
async fn test_registry_ignores_case_and_whitespace() {
    let orch = run_to_end(vec![
        search("q", json!([source("ab1", "Old")])),
        search("q", json!([source(" AB1 ", "New"), source("ab1", "Newest")])),
        step_start(1),
    ])
    .await;

    let registry = orch.registry();
    assert_eq!(registry.len(), 1);
    for key in ["ab1", " AB1 ", "Ab1"] {
        assert_eq!(registry.lookup(key).unwrap().title, "Newest");
    }
}

#[tokio::test]
async fn test_string_board_id_still_reported() {
    let orch = run_to_end(vec![
        search("q", json!([source("a", "A")])),
        add_source("a", "first", "added as #3"),
        frame(json!({
            "type": "observation",
            "tool": "edit_note",
            "error": false,
            "output_text": "",
            "board_id": "3",
            "new_note": "from text id",
        })),
        frame(json!({
            "type": "observation",
            "tool": "edit_note",
            "error": false,
            "output_text": "",
            "board_id": "third",
            "new_note": "ignored",
        })),
        run_end("submitted", json!({}), json!([])),
    ])
    .await;

    assert_eq!(orch.board_entry(3).unwrap().note, "from text id");
    let edits: Vec<i64> = orch
        .transcript()
        .iter()
        .filter_map(|m| match &m.kind {
            MessageKind::EditNote { board_id, .. } => Some(*board_id),
            _ => None,
        })
        .collect();
    assert_eq!(edits, vec![3, 0]);
}
