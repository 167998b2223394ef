// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The adapter abstraction: a polymorphic component over
//! {isAvailable, createSession, destroySession}, and the per-session handle
//! it hands back.

use crate::event::AdapterEvent;
use async_trait::async_trait;
use bridge_core::Attachment;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to spawn assistant process: {0}")]
    SpawnFailed(String),
    #[error("adapter crashed: {0}")]
    AdapterCrash(String),
    #[error("adapter session not found: {0}")]
    NotFound(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credentials for the special "collect files" control message.
#[derive(Debug, Clone)]
pub struct UploadCredentials {
    pub url: String,
    pub token: String,
}

/// A polymorphic driver for a local or remote assistant.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Whether this adapter's backend (binary, gateway) looks reachable.
    async fn is_available(&self) -> bool;

    /// Create a session bound to `workspace`. `session_id` is used only for
    /// logging/correlation; the adapter holds no cross-session state.
    async fn create_session(
        &self,
        session_id: &str,
        workspace: PathBuf,
    ) -> Result<SessionHandle, AdapterError>;
}

/// One running (or idle) adapter session.
///
/// The chunk/tool_event/done/error subscription sinks are modeled as a
/// single `AdapterEvent` stream, taken once by the session manager when it
/// wires callbacks.
pub struct SessionHandle {
    backend: Box<dyn SessionBackend>,
    events_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<AdapterEvent>>>,
}

impl SessionHandle {
    pub fn new(
        backend: Box<dyn SessionBackend>,
        events_rx: mpsc::UnboundedReceiver<AdapterEvent>,
    ) -> Self {
        Self { backend, events_rx: parking_lot::Mutex::new(Some(events_rx)) }
    }

    /// Take the event stream. Returns `None` if already taken — a session's
    /// callbacks are wired exactly once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<AdapterEvent>> {
        self.events_rx.lock().take()
    }

    pub async fn send(
        &self,
        content: &str,
        attachments: &[Attachment],
        upload_credentials: Option<UploadCredentials>,
        client_id: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.backend.send(content, attachments, upload_credentials, client_id).await
    }

    pub async fn kill(&self) {
        self.backend.kill().await
    }
}

/// Per-variant implementation backing a [`SessionHandle`].
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn send(
        &self,
        content: &str,
        attachments: &[Attachment],
        upload_credentials: Option<UploadCredentials>,
        client_id: Option<&str>,
    ) -> Result<(), AdapterError>;

    async fn kill(&self);
}
