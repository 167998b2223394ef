// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire frame shapes for the bridge ⇄ platform WebSocket protocol.
//!
//! Frames are JSON objects tagged by a string `type` field, exchanged as
//! WebSocket text frames. There is no length-prefix framing: the WebSocket
//! layer already delimits messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Current protocol version. Sent in `register`; the platform may reject a
/// mismatch in `registered`.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),
}

/// The kind of a `chunk` frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Text,
    ToolStart,
    ToolInput,
    ToolResult,
    Thinking,
    Status,
}

/// Frames sent from the bridge to the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpstreamFrame {
    Register {
        agent_id: String,
        token: String,
        protocol_version: u32,
        adapter_type: String,
        #[serde(default)]
        capabilities: Vec<String>,
    },
    Chunk {
        session_id: String,
        request_id: String,
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ChunkKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    Done {
        session_id: String,
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<bridge_core::Attachment>,
    },
    Error {
        session_id: String,
        request_id: String,
        code: String,
        message: String,
    },
    Heartbeat {
        active_sessions: u32,
        uptime_ms: u64,
    },
}

/// Frames sent from the platform to the bridge.
///
/// `Unknown` captures any `type` the bridge doesn't recognize; callers log
/// and drop it.
#[derive(Debug, Clone, PartialEq)]
pub enum DownstreamFrame {
    Registered { status: String, reason: Option<String> },
    Message {
        session_id: String,
        request_id: String,
        content: String,
        attachments: Vec<String>,
        client_id: Option<String>,
        upload_url: Option<String>,
        upload_token: Option<String>,
    },
    Cancel { session_id: String, request_id: String },
    Unknown { tag: String, raw: Value },
}

impl Serialize for DownstreamFrame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        #[serde(tag = "type", rename_all = "snake_case")]
        enum Wire<'a> {
            Registered { status: &'a str, reason: &'a Option<String> },
            Message {
                session_id: &'a str,
                request_id: &'a str,
                content: &'a str,
                attachments: &'a Vec<String>,
                client_id: &'a Option<String>,
                upload_url: &'a Option<String>,
                upload_token: &'a Option<String>,
            },
            Cancel { session_id: &'a str, request_id: &'a str },
        }

        match self {
            DownstreamFrame::Registered { status, reason } => {
                Wire::Registered { status, reason }.serialize(serializer)
            }
            DownstreamFrame::Message {
                session_id,
                request_id,
                content,
                attachments,
                client_id,
                upload_url,
                upload_token,
            } => Wire::Message {
                session_id,
                request_id,
                content,
                attachments,
                client_id,
                upload_url,
                upload_token,
            }
            .serialize(serializer),
            DownstreamFrame::Cancel { session_id, request_id } => {
                Wire::Cancel { session_id, request_id }.serialize(serializer)
            }
            DownstreamFrame::Unknown { raw, .. } => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DownstreamFrame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let tag = value.get("type").and_then(Value::as_str).unwrap_or("").to_string();

        #[derive(Deserialize)]
        struct RegisteredBody {
            status: String,
            #[serde(default)]
            reason: Option<String>,
        }
        #[derive(Deserialize)]
        struct MessageBody {
            session_id: String,
            request_id: String,
            content: String,
            #[serde(default)]
            attachments: Vec<String>,
            #[serde(default)]
            client_id: Option<String>,
            #[serde(default)]
            upload_url: Option<String>,
            #[serde(default)]
            upload_token: Option<String>,
        }
        #[derive(Deserialize)]
        struct CancelBody {
            session_id: String,
            request_id: String,
        }

        match tag.as_str() {
            "registered" => {
                let b: RegisteredBody =
                    serde_json::from_value(value).map_err(serde::de::Error::custom)?;
                Ok(DownstreamFrame::Registered { status: b.status, reason: b.reason })
            }
            "message" => {
                let b: MessageBody =
                    serde_json::from_value(value).map_err(serde::de::Error::custom)?;
                Ok(DownstreamFrame::Message {
                    session_id: b.session_id,
                    request_id: b.request_id,
                    content: b.content,
                    attachments: b.attachments,
                    client_id: b.client_id,
                    upload_url: b.upload_url,
                    upload_token: b.upload_token,
                })
            }
            "cancel" => {
                let b: CancelBody =
                    serde_json::from_value(value).map_err(serde::de::Error::custom)?;
                Ok(DownstreamFrame::Cancel { session_id: b.session_id, request_id: b.request_id })
            }
            other => Ok(DownstreamFrame::Unknown { tag: other.to_string(), raw: value }),
        }
    }
}

/// Serialize a frame to its JSON wire representation.
pub fn encode<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(ProtocolError::Encode)
}

/// Deserialize a frame from its JSON wire representation.
pub fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
