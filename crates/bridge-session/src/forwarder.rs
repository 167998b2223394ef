// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session forwarder task: owns a session's taken `AdapterEvent`
//! receiver for its whole lifetime and translates each event into an
//! upstream frame, applying the output guard and, on a plain completion,
//! diffing and uploading the workspace.

use crate::pool::CurrentRequest;
use bridge_adapter::AdapterEvent;
use bridge_core::{Attachment, RequestStatus};
use bridge_guards::apply_output_guard;
use bridge_protocol::UpstreamFrame;
use bridge_upload::UploadClient;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Spawn the forwarder task for one pooled session. `on_terminal` lets the
/// caller update its own request-tracker bookkeeping without the forwarder
/// needing to know its shape.
pub fn spawn(
    session_id: String,
    mut events_rx: mpsc::UnboundedReceiver<AdapterEvent>,
    outbound: mpsc::UnboundedSender<UpstreamFrame>,
    current: Arc<Mutex<CurrentRequest>>,
    workspace: PathBuf,
    upload_client: UploadClient,
    max_diff_entries: usize,
    on_terminal: Arc<dyn Fn(String, String, RequestStatus) + Send + Sync>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let request_id = current.lock().request_id.clone();
            match event {
                AdapterEvent::Chunk { kind, delta, tool_name, tool_call_id } => {
                    let delta = apply_output_guard(&delta);
                    let _ = outbound.send(UpstreamFrame::Chunk {
                        session_id: session_id.clone(),
                        request_id,
                        delta,
                        kind: Some(kind),
                        tool_name,
                        tool_call_id,
                    });
                }
                AdapterEvent::Done { result, attachments } => {
                    let result = result.map(|r| apply_output_guard(&r));
                    let attachments = if attachments.is_empty() {
                        collect_attachments(&workspace, &current, &upload_client, max_diff_entries).await
                    } else {
                        attachments
                    };
                    on_terminal(session_id.clone(), request_id.clone(), RequestStatus::Done);
                    let _ = outbound.send(UpstreamFrame::Done {
                        session_id: session_id.clone(),
                        request_id,
                        result,
                        attachments,
                    });
                }
                AdapterEvent::Error { code, message } => {
                    on_terminal(session_id.clone(), request_id.clone(), RequestStatus::Error);
                    let _ = outbound.send(UpstreamFrame::Error {
                        session_id: session_id.clone(),
                        request_id,
                        code,
                        message,
                    });
                }
            }
        }
        tracing::debug!(session_id, "forwarder task exiting, adapter event stream closed");
    })
}

/// Diff the workspace against the pre-send snapshot and upload whatever
/// changed. Returns an empty list if no upload credentials were supplied
/// with the request, or if the diff itself fails.
async fn collect_attachments(
    workspace: &Path,
    current: &Mutex<CurrentRequest>,
    upload_client: &UploadClient,
    max_diff_entries: usize,
) -> Vec<Attachment> {
    let (snapshot, upload_url, upload_token) = {
        let current = current.lock();
        (current.snapshot.clone(), current.upload_url.clone(), current.upload_token.clone())
    };
    let (Some(upload_url), Some(upload_token)) = (upload_url, upload_token) else {
        return Vec::new();
    };

    let changed = match bridge_workspace::diff(&snapshot, workspace, max_diff_entries) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(workspace = %workspace.display(), error = %e, "workspace diff failed, no attachments uploaded");
            return Vec::new();
        }
    };

    let mut attachments = Vec::with_capacity(changed.len());
    for absolute in changed {
        let relative = absolute
            .strip_prefix(workspace)
            .unwrap_or(&absolute)
            .to_string_lossy()
            .replace('\\', "/");
        if let Some(attachment) =
            upload_client.upload_or_log(&upload_url, &upload_token, &relative, &absolute).await
        {
            attachments.push(attachment);
        }
    }
    attachments
}

#[cfg(test)]
#[path = "forwarder_tests.rs"]
mod tests;
