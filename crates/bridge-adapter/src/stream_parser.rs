// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure state machine over the assistant's line-delimited streaming JSON
//! event shape. One `StreamParser` per session/request;
//! fed one already-deserialized JSON value per non-empty stdout line.
//!
//! Chunk kind is read from whichever of the outer block type or the inner
//! delta type the event actually carries — different assistant builds put
//! it in one or the other.

use crate::event::AdapterEvent;
use bridge_protocol::ChunkKind;
use serde_json::Value;

const CHUNK_SPLIT_TARGET: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Thinking,
    ToolUse,
}

#[derive(Debug, Clone)]
struct ActiveTool {
    id: String,
    name: String,
}

#[derive(Debug, Default)]
pub struct StreamParser {
    current_block: Option<BlockKind>,
    active_tool: Option<ActiveTool>,
    text_chunk_emitted: bool,
    finished: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parsed JSON line. Returns the events it produces, in order.
    /// Parse failures are the caller's concern (debug-logged and skipped
    /// before this is ever called).
    pub fn feed(&mut self, event: &Value) -> Vec<AdapterEvent> {
        if self.finished {
            return Vec::new();
        }
        let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
        match event_type {
            "content_block_start" => self.on_block_start(event),
            "content_block_delta" => self.on_block_delta(event),
            "content_block_stop" => {
                self.current_block = None;
                self.active_tool = None;
                Vec::new()
            }
            "user" | "message" => self.on_role_event(event),
            "result" => self.on_result(event),
            _ => Vec::new(),
        }
    }

    fn on_block_start(&mut self, event: &Value) -> Vec<AdapterEvent> {
        let block = event.get("content_block").unwrap_or(event);
        let block_type = block.get("type").and_then(Value::as_str).unwrap_or("");
        match block_type {
            "text" => {
                self.current_block = Some(BlockKind::Text);
                Vec::new()
            }
            "thinking" => {
                self.current_block = Some(BlockKind::Thinking);
                Vec::new()
            }
            "tool_use" => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
                let name =
                    block.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                self.current_block = Some(BlockKind::ToolUse);
                self.active_tool = Some(ActiveTool { id: id.clone(), name: name.clone() });
                vec![AdapterEvent::Chunk {
                    kind: ChunkKind::ToolStart,
                    delta: String::new(),
                    tool_name: Some(name),
                    tool_call_id: Some(id),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn on_block_delta(&mut self, event: &Value) -> Vec<AdapterEvent> {
        let delta = event.get("delta").unwrap_or(event);
        let delta_type = delta.get("type").and_then(Value::as_str).unwrap_or("");
        match delta_type {
            "text_delta" => {
                let text = delta.get("text").and_then(Value::as_str).unwrap_or_default();
                if text.is_empty() {
                    return Vec::new();
                }
                self.text_chunk_emitted = true;
                let kind = if self.current_block == Some(BlockKind::Thinking) {
                    ChunkKind::Thinking
                } else {
                    ChunkKind::Text
                };
                vec![AdapterEvent::Chunk {
                    kind,
                    delta: text.to_string(),
                    tool_name: None,
                    tool_call_id: None,
                }]
            }
            "input_json_delta" => {
                let Some(tool) = self.active_tool.clone() else {
                    return Vec::new();
                };
                let partial = delta
                    .get("partial_json")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                vec![AdapterEvent::Chunk {
                    kind: ChunkKind::ToolInput,
                    delta: partial,
                    tool_name: Some(tool.name),
                    tool_call_id: Some(tool.id),
                }]
            }
            _ => Vec::new(),
        }
    }

    /// A `user`-role event carries tool results back from the harness.
    fn on_role_event(&mut self, event: &Value) -> Vec<AdapterEvent> {
        let content = event
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_array);
        let Some(content) = content else { return Vec::new() };

        content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_result"))
            .map(|block| {
                let tool_call_id = block
                    .get("tool_use_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let is_error = block.get("is_error").and_then(Value::as_bool).unwrap_or(false);
                let body = tool_result_text(block);
                let delta = if is_error { format!("[error] {body}") } else { body };
                AdapterEvent::Chunk {
                    kind: ChunkKind::ToolResult,
                    delta,
                    tool_name: None,
                    tool_call_id: Some(tool_call_id),
                }
            })
            .collect()
    }

    fn on_result(&mut self, event: &Value) -> Vec<AdapterEvent> {
        self.finished = true;
        let is_error = event.get("is_error").and_then(Value::as_bool).unwrap_or(false);
        if is_error {
            let message = event
                .get("result")
                .and_then(Value::as_str)
                .or_else(|| event.get("error").and_then(Value::as_str))
                .unwrap_or("assistant reported an error")
                .to_string();
            return vec![AdapterEvent::Error { code: "ADAPTER_ERROR".into(), message }];
        }

        let final_text = event.get("result").and_then(Value::as_str).map(str::to_string);
        let mut events = Vec::new();
        if !self.text_chunk_emitted {
            if let Some(text) = &final_text {
                events.extend(split_into_chunks(text));
            }
        }
        events.push(AdapterEvent::Done { result: final_text, attachments: Vec::new() });
        events
    }
}

fn tool_result_text(block: &Value) -> String {
    match block.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Split `text` into chunks of roughly `CHUNK_SPLIT_TARGET` characters,
/// preferring to break at a newline, sentence punctuation, comma, or space.
fn split_into_chunks(text: &str) -> Vec<AdapterEvent> {
    const BREAK_CHARS: &[char] = &['\n', '.', '!', '?', ',', ' '];
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let remaining = chars.len() - start;
        if remaining <= CHUNK_SPLIT_TARGET {
            out.push(AdapterEvent::text(chars[start..].iter().collect::<String>()));
            break;
        }
        let window_end = start + CHUNK_SPLIT_TARGET;
        let break_at = chars[start..window_end]
            .iter()
            .rposition(|c| BREAK_CHARS.contains(c))
            .map(|rel| start + rel + 1)
            .unwrap_or(window_end);
        out.push(AdapterEvent::text(chars[start..break_at].iter().collect::<String>()));
        start = break_at;
    }
    out
}

#[cfg(test)]
#[path = "stream_parser_tests.rs"]
mod tests;
