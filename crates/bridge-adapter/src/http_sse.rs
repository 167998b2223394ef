// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/SSE adapter variant for remote gateway assistants:
//! opens a POST to the gateway, streams OpenAI-style `choices[0].delta.content`
//! SSE lines, and accumulates conversation history per session.

use crate::collect_files;
use crate::event::AdapterEvent;
use crate::trait_def::{Adapter, AdapterError, SessionBackend, SessionHandle, UploadCredentials};
use async_trait::async_trait;
use bridge_core::Attachment;
use bridge_upload::UploadClient;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize)]
struct ConversationTurn {
    role: &'static str,
    content: String,
}

#[derive(Clone)]
pub struct HttpSseAdapter {
    gateway_url: String,
    http: reqwest::Client,
    upload_client: UploadClient,
}

impl HttpSseAdapter {
    pub fn new(gateway_url: String) -> Self {
        Self { gateway_url, http: reqwest::Client::new(), upload_client: UploadClient::new() }
    }
}

#[async_trait]
impl Adapter for HttpSseAdapter {
    async fn is_available(&self) -> bool {
        self.http.head(&self.gateway_url).send().await.is_ok()
    }

    async fn create_session(
        &self,
        _session_id: &str,
        workspace: PathBuf,
    ) -> Result<SessionHandle, AdapterError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let backend = HttpSseBackend {
            adapter: self.clone(),
            workspace,
            history: Arc::new(Mutex::new(Vec::new())),
            events_tx,
            in_flight: Mutex::new(None),
        };
        Ok(SessionHandle::new(Box::new(backend), events_rx))
    }
}

struct HttpSseBackend {
    adapter: HttpSseAdapter,
    workspace: PathBuf,
    history: Arc<Mutex<Vec<ConversationTurn>>>,
    events_tx: mpsc::UnboundedSender<AdapterEvent>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ConversationTurn],
    stream: bool,
}

#[async_trait]
impl SessionBackend for HttpSseBackend {
    async fn send(
        &self,
        content: &str,
        _attachments: &[Attachment],
        upload_credentials: Option<UploadCredentials>,
        _client_id: Option<&str>,
    ) -> Result<(), AdapterError> {
        if let Some((url, token)) = collect_files::detect(content) {
            let (url, token) =
                upload_credentials.map(|c| (c.url, c.token)).unwrap_or((url, token));
            let events =
                collect_files::run(&self.workspace, &url, &token, &self.adapter.upload_client).await;
            for event in events {
                let _ = self.events_tx.send(event);
            }
            return Ok(());
        }

        self.history.lock().push(ConversationTurn { role: "user", content: content.to_string() });
        let messages = self.history.lock().clone();

        let request = self
            .adapter
            .http
            .post(&self.adapter.gateway_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&ChatRequest { messages: &messages, stream: true })
            .send();

        let events_tx = self.events_tx.clone();
        let history = self.history.clone();

        let handle = tokio::spawn(async move {
            let response = match request.await {
                Ok(r) => r,
                Err(e) => {
                    let _ = events_tx.send(AdapterEvent::Error {
                        code: "ADAPTER_CRASH".into(),
                        message: format!("gateway request failed: {e}"),
                    });
                    return;
                }
            };

            let mut accumulated = String::new();
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = stream.next().await {
                let Ok(chunk) = chunk else { break };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=pos);
                    let Some(data) = line.strip_prefix("data:") else { continue };
                    let data = data.trim();
                    if data == "[DONE]" {
                        history.lock().push(ConversationTurn {
                            role: "assistant",
                            content: accumulated.clone(),
                        });
                        let _ = events_tx.send(AdapterEvent::Done {
                            result: Some(accumulated.clone()),
                            attachments: Vec::new(),
                        });
                        return;
                    }
                    if let Some(delta) = extract_delta_content(data) {
                        if !delta.is_empty() {
                            accumulated.push_str(&delta);
                            let _ = events_tx.send(AdapterEvent::text(delta));
                        }
                    }
                }
            }
            history.lock().push(ConversationTurn { role: "assistant", content: accumulated.clone() });
            let _ = events_tx
                .send(AdapterEvent::Done { result: Some(accumulated), attachments: Vec::new() });
        });

        if let Some(previous) = self.in_flight.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn kill(&self) {
        if let Some(handle) = self.in_flight.lock().take() {
            handle.abort();
        }
    }
}

fn extract_delta_content(data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
#[path = "http_sse_tests.rs"]
mod tests;
