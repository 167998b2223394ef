// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::event::AdapterEvent;
use crate::trait_def::{Adapter, AdapterError, SessionBackend, SessionHandle, UploadCredentials};
use async_trait::async_trait;
use bridge_core::Attachment;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One recorded `send()` call against a [`FakeAdapter`] session.
#[derive(Debug, Clone)]
pub struct SendCall {
    pub session_id: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub client_id: Option<String>,
}

struct FakeAdapterState {
    available: bool,
    calls: Vec<SendCall>,
    senders: HashMap<String, mpsc::UnboundedSender<AdapterEvent>>,
    killed: Vec<String>,
}

/// In-memory [`Adapter`] for session-manager tests: records every `send()`
/// call and lets the test push [`AdapterEvent`]s onto a session's stream on
/// demand, mirroring a notify-style fake adapter pattern.
#[derive(Clone)]
pub struct FakeAdapter {
    inner: Arc<Mutex<FakeAdapterState>>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeAdapterState {
                available: true,
                calls: Vec::new(),
                senders: HashMap::new(),
                killed: Vec::new(),
            })),
        }
    }
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        let adapter = Self::default();
        adapter.inner.lock().available = false;
        adapter
    }

    pub fn calls(&self) -> Vec<SendCall> {
        self.inner.lock().calls.clone()
    }

    pub fn killed_sessions(&self) -> Vec<String> {
        self.inner.lock().killed.clone()
    }

    /// Push an event onto a session's stream as though the backing process
    /// emitted it. Panics if the session was never created or its stream was
    /// never taken — both indicate a test bug, not a runtime condition.
    pub fn push_event(&self, session_id: &str, event: AdapterEvent) {
        let inner = self.inner.lock();
        let sender = inner
            .senders
            .get(session_id)
            .unwrap_or_else(|| panic!("no fake session registered for {session_id}"));
        let _ = sender.send(event);
    }
}

#[async_trait]
impl Adapter for FakeAdapter {
    async fn is_available(&self) -> bool {
        self.inner.lock().available
    }

    async fn create_session(
        &self,
        session_id: &str,
        _workspace: PathBuf,
    ) -> Result<SessionHandle, AdapterError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.inner.lock().senders.insert(session_id.to_string(), events_tx);
        let backend = FakeSessionBackend {
            session_id: session_id.to_string(),
            state: self.inner.clone(),
        };
        Ok(SessionHandle::new(Box::new(backend), events_rx))
    }
}

struct FakeSessionBackend {
    session_id: String,
    state: Arc<Mutex<FakeAdapterState>>,
}

#[async_trait]
impl SessionBackend for FakeSessionBackend {
    async fn send(
        &self,
        content: &str,
        attachments: &[Attachment],
        _upload_credentials: Option<UploadCredentials>,
        client_id: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.state.lock().calls.push(SendCall {
            session_id: self.session_id.clone(),
            content: content.to_string(),
            attachments: attachments.to_vec(),
            client_id: client_id.map(str::to_string),
        });
        Ok(())
    }

    async fn kill(&self) {
        self.state.lock().killed.push(self.session_id.clone());
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
