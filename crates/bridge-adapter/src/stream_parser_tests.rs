// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn text_delta_emits_text_chunk() {
    let mut parser = StreamParser::new();
    parser.feed(&json!({"type": "content_block_start", "content_block": {"type": "text"}}));
    let events = parser.feed(&json!({
        "type": "content_block_delta",
        "delta": {"type": "text_delta", "text": "hello"}
    }));
    assert_eq!(events, vec![AdapterEvent::text("hello")]);
}

#[test]
fn thinking_block_marks_deltas_as_thinking_chunks() {
    let mut parser = StreamParser::new();
    parser.feed(&json!({"type": "content_block_start", "content_block": {"type": "thinking"}}));
    let events = parser.feed(&json!({
        "type": "content_block_delta",
        "delta": {"type": "text_delta", "text": "pondering"}
    }));
    assert_eq!(
        events,
        vec![AdapterEvent::Chunk {
            kind: ChunkKind::Thinking,
            delta: "pondering".into(),
            tool_name: None,
            tool_call_id: None,
        }]
    );
}

#[test]
fn tool_use_sequence_emits_start_then_input() {
    let mut parser = StreamParser::new();
    let start_events = parser.feed(&json!({
        "type": "content_block_start",
        "content_block": {"type": "tool_use", "id": "call-1", "name": "Bash"}
    }));
    assert_eq!(
        start_events,
        vec![AdapterEvent::Chunk {
            kind: ChunkKind::ToolStart,
            delta: String::new(),
            tool_name: Some("Bash".into()),
            tool_call_id: Some("call-1".into()),
        }]
    );

    let input_events = parser.feed(&json!({
        "type": "content_block_delta",
        "delta": {"type": "input_json_delta", "partial_json": "{\"cmd\":"}
    }));
    assert_eq!(
        input_events,
        vec![AdapterEvent::Chunk {
            kind: ChunkKind::ToolInput,
            delta: "{\"cmd\":".into(),
            tool_name: Some("Bash".into()),
            tool_call_id: Some("call-1".into()),
        }]
    );

    let stop_events = parser.feed(&json!({"type": "content_block_stop"}));
    assert!(stop_events.is_empty());
}

#[test]
fn tool_result_error_flag_is_prefixed() {
    let mut parser = StreamParser::new();
    let events = parser.feed(&json!({
        "type": "user",
        "message": {
            "content": [
                {"type": "tool_result", "tool_use_id": "call-1", "content": "boom", "is_error": true}
            ]
        }
    }));
    assert_eq!(
        events,
        vec![AdapterEvent::Chunk {
            kind: ChunkKind::ToolResult,
            delta: "[error] boom".into(),
            tool_name: None,
            tool_call_id: Some("call-1".into()),
        }]
    );
}

#[test]
fn terminal_result_with_prior_chunks_emits_done_without_resplitting() {
    let mut parser = StreamParser::new();
    parser.feed(&json!({"type": "content_block_start", "content_block": {"type": "text"}}));
    parser.feed(&json!({
        "type": "content_block_delta",
        "delta": {"type": "text_delta", "text": "Hello world"}
    }));
    let events = parser.feed(&json!({"type": "result", "is_error": false, "result": "Hello world"}));
    assert_eq!(
        events,
        vec![AdapterEvent::Done { result: Some("Hello world".into()), attachments: Vec::new() }]
    );
}

#[test]
fn terminal_result_with_no_prior_chunks_splits_the_final_string() {
    let mut parser = StreamParser::new();
    let long_text = "a".repeat(40) + ". " + &"b".repeat(40);
    let events = parser.feed(&json!({"type": "result", "is_error": false, "result": long_text}));
    let Some((last, chunks)) = events.split_last() else {
        panic!("expected at least one event");
    };
    assert!(chunks.len() >= 1, "expected fallback chunks before done");
    for chunk in chunks {
        match chunk {
            AdapterEvent::Chunk { kind: ChunkKind::Text, delta, .. } => {
                assert!(delta.len() <= 65, "chunk too long: {delta:?}");
            }
            other => panic!("expected text chunk, got {other:?}"),
        }
    }
    assert!(matches!(last, AdapterEvent::Done { .. }));
}

#[test]
fn terminal_result_error_suppresses_done() {
    let mut parser = StreamParser::new();
    let events = parser.feed(&json!({"type": "result", "is_error": true, "result": "went wrong"}));
    assert_eq!(events, vec![AdapterEvent::Error { code: "ADAPTER_ERROR".into(), message: "went wrong".into() }]);
}

#[test]
fn events_after_terminal_result_are_ignored() {
    let mut parser = StreamParser::new();
    parser.feed(&json!({"type": "result", "is_error": false, "result": "done"}));
    let events = parser.feed(&json!({
        "type": "content_block_delta",
        "delta": {"type": "text_delta", "text": "late"}
    }));
    assert!(events.is_empty());
}

#[test]
fn empty_text_delta_emits_nothing() {
    let mut parser = StreamParser::new();
    let events = parser.feed(&json!({
        "type": "content_block_delta",
        "delta": {"type": "text_delta", "text": ""}
    }));
    assert!(events.is_empty());
}
