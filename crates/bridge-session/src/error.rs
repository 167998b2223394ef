// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for a single `message()` dispatch, mapped to the `code`
//! field of the upstream `error` frame it produces.

use bridge_adapter::AdapterError;
use bridge_queue::QueueError;
use bridge_workspace::WorkspaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to prepare client workspace: {0}")]
    Workspace(#[from] WorkspaceError),
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("adapter returned a session handle with no event stream to take")]
    EventsAlreadyTaken,
}

impl SessionError {
    /// Short error code surfaced in the upstream `error{code, ...}` frame.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Workspace(_) => "workspace_error",
            SessionError::Adapter(_) => "adapter_error",
            SessionError::Queue(e) => e.code().unwrap_or("queue_error"),
            SessionError::EventsAlreadyTaken => "adapter_error",
        }
    }
}
