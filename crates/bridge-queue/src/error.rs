// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Error taxonomy for the runtime queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue_full")]
    QueueFull,
    #[error("queue_timeout")]
    QueueTimeout,
    #[error("queue_aborted")]
    QueueAborted,
    #[error("queue_cancelled")]
    QueueCancelled,
    #[error("lock_timeout")]
    LockTimeout,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueueError {
    /// The short error code surfaced in an upstream `error{code, ...}`
    /// frame. Returns `None` for [`QueueError::Io`], which isn't part of
    /// the queue's own error taxonomy.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            QueueError::QueueFull => Some("queue_full"),
            QueueError::QueueTimeout => Some("queue_timeout"),
            QueueError::QueueAborted => Some("queue_aborted"),
            QueueError::QueueCancelled => Some("queue_cancelled"),
            QueueError::LockTimeout => Some("lock_timeout"),
            QueueError::Io(_) => None,
        }
    }
}
