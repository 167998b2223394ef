// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical events an adapter session emits while it drives a request.

use bridge_core::Attachment;
use bridge_protocol::ChunkKind;

/// One event from a running adapter session.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Chunk {
        kind: ChunkKind,
        delta: String,
        tool_name: Option<String>,
        tool_call_id: Option<String>,
    },
    Done { result: Option<String>, attachments: Vec<Attachment> },
    Error { code: String, message: String },
}

impl AdapterEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        AdapterEvent::Chunk { kind: ChunkKind::Text, delta: delta.into(), tool_name: None, tool_call_id: None }
    }
}
