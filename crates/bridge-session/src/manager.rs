// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session manager: owns the pool of live adapter sessions and the
//! request dedup tracker, and runs the per-request admission/guard/send
//! pipeline that turns a downstream `message` into adapter input. Terminal
//! results arrive later, asynchronously, through each session's forwarder
//! task.

use crate::error::SessionError;
use crate::forwarder;
use crate::pool::{CurrentRequest, PooledSession};
use crate::tracker::{RequestTracker, DEFAULT_TTL_MS};
use bridge_adapter::{Adapter, SessionHandle, UploadCredentials};
use bridge_core::{logical_session_prefix, Clock, QueueLimits, RequestStatus};
use bridge_guards::apply_input_guard;
use bridge_protocol::UpstreamFrame;
use bridge_upload::UploadClient;
use bridge_workspace::ensure_client_workspace;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

/// How often the idle sweep prunes expired tracker entries and evicts
/// adapter sessions that have been quiet past their TTL.
pub const IDLE_SWEEP_INTERVAL_MS: u64 = 60_000;

struct ManagerState {
    pool: HashMap<String, PooledSession>,
    tracker: RequestTracker,
}

/// A resolved session: the handle to send through, plus the shared cell the
/// forwarder task reads to attribute in-flight events to a request.
struct SessionRef {
    handle: Arc<SessionHandle>,
    workspace: PathBuf,
    current: Arc<SyncMutex<CurrentRequest>>,
}

pub struct SessionManager<C: Clock> {
    adapter: Arc<dyn Adapter>,
    outbound: mpsc::UnboundedSender<UpstreamFrame>,
    upload_client: UploadClient,
    clock: C,
    runtime_dir: PathBuf,
    projects_root: PathBuf,
    agent_id: String,
    pid: u32,
    queue_limits: QueueLimits,
    session_idle_ttl_ms: u64,
    state: Arc<AsyncMutex<ManagerState>>,
    session_count: Arc<AtomicUsize>,
}

impl<C: Clock> SessionManager<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        adapter: Arc<dyn Adapter>,
        outbound: mpsc::UnboundedSender<UpstreamFrame>,
        upload_client: UploadClient,
        clock: C,
        runtime_dir: PathBuf,
        projects_root: PathBuf,
        agent_id: String,
        queue_limits: QueueLimits,
        session_idle_ttl_ms: u64,
    ) -> Self {
        Self {
            adapter,
            outbound,
            upload_client,
            clock,
            runtime_dir,
            projects_root,
            agent_id,
            pid: std::process::id(),
            queue_limits,
            session_idle_ttl_ms,
            state: Arc::new(AsyncMutex::new(ManagerState { pool: HashMap::new(), tracker: RequestTracker::new() })),
            session_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Snapshot of how many adapter sessions are currently pooled. Read
    /// synchronously off an atomic so it can back the transport's heartbeat
    /// payload without awaiting the (async) state lock.
    pub fn active_session_count(&self) -> u32 {
        self.session_count.load(Ordering::Relaxed) as u32
    }

    /// Destroy every pooled adapter session. Called once by the supervisor
    /// during shutdown, after its drain window has elapsed or been skipped.
    pub async fn shutdown(&self) {
        let sessions: Vec<(String, Arc<SessionHandle>)> = {
            let mut state = self.state.lock().await;
            state.pool.drain().map(|(session_id, pooled)| (session_id, pooled.handle)).collect()
        };
        self.session_count.store(0, Ordering::Relaxed);
        for (session_id, handle) in sessions {
            tracing::info!(session_id, "destroying adapter session on shutdown");
            handle.kill().await;
        }
    }

    /// Handle one downstream `message` frame end to end: dedup, logical
    /// session replacement, session lookup or creation, queue admission,
    /// the input guard, and the adapter `send()` call. A failure before
    /// `send()` is reported as a one-shot upstream `error` frame, since no
    /// forwarder task exists yet to report it otherwise.
    #[allow(clippy::too_many_arguments)]
    pub async fn message(
        &self,
        session_id: String,
        request_id: String,
        content: String,
        client_id: Option<String>,
        upload_url: Option<String>,
        upload_token: Option<String>,
    ) {
        let now = self.clock.epoch_ms();

        let (already_seen, superseded) = {
            let mut state = self.state.lock().await;
            state.tracker.prune_expired(now);
            let already_seen = state.tracker.contains(&session_id, &request_id);
            if already_seen {
                (true, None)
            } else {
                state.tracker.insert_active(&session_id, &request_id, now, DEFAULT_TTL_MS);
                let superseded = logical_session_prefix(&session_id).and_then(|prefix| {
                    let stale_key = state.pool.keys().find(|existing| {
                        *existing != &session_id && logical_session_prefix(existing).as_ref() == Some(&prefix)
                    })?;
                    let stale_key = stale_key.clone();
                    let removed = state.pool.remove(&stale_key);
                    if removed.is_some() {
                        self.session_count.fetch_sub(1, Ordering::Relaxed);
                    }
                    removed
                });
                (false, superseded)
            }
        };

        if let Some(stale) = superseded {
            tracing::info!(session_id = %session_id, "tearing down superseded logical session");
            stale.handle.kill().await;
        }

        if already_seen {
            tracing::debug!(session_id = %session_id, request_id = %request_id, "dropping duplicate message");
            return;
        }

        if let Err(err) =
            self.dispatch(&session_id, &request_id, &content, client_id.as_deref(), upload_url, upload_token).await
        {
            tracing::warn!(session_id = %session_id, request_id = %request_id, error = %err, "message dispatch failed");
            self.state.lock().await.tracker.mark(&session_id, &request_id, RequestStatus::Error);
            let _ = self.outbound.send(UpstreamFrame::Error {
                session_id,
                request_id,
                code: err.code().to_string(),
                message: err.to_string(),
            });
        }
    }

    /// Cancel an in-flight or still-queued request. Marks the tracker entry
    /// cancelled, removes it from the runtime queue if it hadn't started
    /// yet, and, if it was this exact request that was currently running on
    /// the session, destroys the pool entry and kills the adapter session.
    pub async fn cancel(&self, session_id: &str, request_id: &str) {
        let removed = {
            let mut state = self.state.lock().await;
            state.tracker.mark(session_id, request_id, RequestStatus::Cancelled);
            let is_current = state.pool.get(session_id).is_some_and(|p| p.current.lock().request_id == request_id);
            if is_current {
                let removed = state.pool.remove(session_id);
                if removed.is_some() {
                    self.session_count.fetch_sub(1, Ordering::Relaxed);
                }
                removed
            } else {
                None
            }
        };

        let request_key = bridge_queue::request_key(&self.agent_id, session_id, request_id);
        if let Err(e) = bridge_queue::cancel_queued(&self.runtime_dir, &self.clock, &request_key).await {
            tracing::debug!(session_id, request_id, error = %e, "cancel_queued was a no-op");
        }

        if let Some(pooled) = removed {
            tracing::info!(session_id, request_id, "killing and destroying adapter session on cancel");
            pooled.handle.kill().await;
        }
    }

    /// Hook for the transport's reconnect lifecycle event. Adapter sessions
    /// are independent of any one websocket connection, so nothing needs to
    /// move; this exists so a reconnect is at least observable in logs.
    pub async fn handle_reconnect(&self) {
        let state = self.state.lock().await;
        tracing::info!(pooled_sessions = state.pool.len(), "transport reconnected, session pool unaffected");
    }

    /// Spawn the periodic idle sweep. Requires `Arc<Self>` since the task
    /// outlives any single caller.
    pub fn spawn_idle_sweep(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(IDLE_SWEEP_INTERVAL_MS)).await;
                self.sweep_once().await;
            }
        })
    }

    async fn sweep_once(&self) {
        let now = self.clock.epoch_ms();
        let idle: Vec<(String, Arc<SessionHandle>)> = {
            let mut state = self.state.lock().await;
            state.tracker.prune_expired(now);
            let idle_keys: Vec<String> = state
                .pool
                .iter()
                .filter(|(_, p)| now.saturating_sub(p.last_seen_epoch_ms) > self.session_idle_ttl_ms)
                .map(|(k, _)| k.clone())
                .collect();
            idle_keys.into_iter().filter_map(|key| state.pool.remove(&key).map(|p| (key, p.handle))).collect()
        };
        self.session_count.fetch_sub(idle.len(), Ordering::Relaxed);
        for (session_id, handle) in idle {
            tracing::info!(session_id, "evicting idle adapter session");
            handle.kill().await;
        }
    }

    async fn dispatch(
        &self,
        session_id: &str,
        request_id: &str,
        content: &str,
        client_id: Option<&str>,
        upload_url: Option<String>,
        upload_token: Option<String>,
    ) -> Result<(), SessionError> {
        let session = self.ensure_session(session_id).await?;

        let request_key = bridge_queue::request_key(&self.agent_id, session_id, request_id);
        let lease = bridge_queue::acquire(
            &self.runtime_dir,
            &self.clock,
            request_key,
            self.pid,
            self.queue_limits.max_active_requests,
            self.queue_limits.queue_max_length,
            self.queue_limits.queue_wait_timeout_ms,
            || false,
        )
        .await
        .map_err(SessionError::from)?;
        lease.start_heartbeat();

        let guarded_content = apply_input_guard(content);
        let upload_credentials = match (&upload_url, &upload_token) {
            (Some(url), Some(token)) => Some(UploadCredentials { url: url.clone(), token: token.clone() }),
            _ => None,
        };

        let snapshot = bridge_workspace::walk(&session.workspace, bridge_workspace::DEFAULT_MAX_ENTRIES)
            .unwrap_or_else(|e| {
                tracing::warn!(session_id, error = %e, "workspace snapshot failed, diffing against an empty baseline");
                bridge_core::FileSnapshot::empty()
            });
        *session.current.lock() =
            CurrentRequest { request_id: request_id.to_string(), upload_url, upload_token, snapshot };

        let send_result = session.handle.send(&guarded_content, &[], upload_credentials, client_id).await;

        // Releasing right after `send()` returns bounds concurrent dispatch
        // rather than concurrent adapter work for backends (HTTP/SSE) whose
        // `send()` doesn't block on the full turn.
        if let Err(e) = lease.release().await {
            tracing::warn!(session_id, request_id, error = %e, "failed to release queue lease");
        }

        {
            let mut state = self.state.lock().await;
            if let Some(pooled) = state.pool.get_mut(session_id) {
                pooled.last_seen_epoch_ms = self.clock.epoch_ms();
            }
        }

        send_result.map_err(SessionError::from)
    }

    /// Look up a pooled session or create one, wiring its forwarder task on
    /// first creation. Creation happens outside the state lock; a race
    /// between two callers creating the same new session is resolved by
    /// keeping whichever insert wins and killing the loser's handle.
    async fn ensure_session(&self, session_id: &str) -> Result<SessionRef, SessionError> {
        {
            let state = self.state.lock().await;
            if let Some(existing) = state.pool.get(session_id) {
                return Ok(SessionRef {
                    handle: existing.handle.clone(),
                    workspace: existing.workspace.clone(),
                    current: existing.current.clone(),
                });
            }
        }

        let workspace = ensure_client_workspace(&self.projects_root, session_id)?;
        let adapter_handle = self.adapter.create_session(session_id, workspace.clone()).await?;
        let handle = Arc::new(adapter_handle);
        let events_rx = handle.take_events().ok_or(SessionError::EventsAlreadyTaken)?;
        let current = Arc::new(SyncMutex::new(CurrentRequest::default()));

        let mut state = self.state.lock().await;
        if let Some(existing) = state.pool.get(session_id) {
            let existing = SessionRef {
                handle: existing.handle.clone(),
                workspace: existing.workspace.clone(),
                current: existing.current.clone(),
            };
            drop(state);
            handle.kill().await;
            return Ok(existing);
        }

        forwarder::spawn(
            session_id.to_string(),
            events_rx,
            self.outbound.clone(),
            current.clone(),
            workspace.clone(),
            self.upload_client.clone(),
            bridge_workspace::DEFAULT_MAX_ENTRIES,
            terminal_callback(self.state.clone()),
        );

        state.pool.insert(
            session_id.to_string(),
            PooledSession {
                handle: handle.clone(),
                workspace: workspace.clone(),
                last_seen_epoch_ms: self.clock.epoch_ms(),
                current: current.clone(),
            },
        );
        self.session_count.fetch_add(1, Ordering::Relaxed);

        Ok(SessionRef { handle, workspace, current })
    }
}

/// Build the forwarder's terminal-status callback. Marking the tracker is a
/// cheap in-memory update, but the state mutex is async, so the update is
/// dispatched onto its own short-lived task rather than making the
/// forwarder's hot loop await a lock for bookkeeping.
fn terminal_callback(
    state: Arc<AsyncMutex<ManagerState>>,
) -> Arc<dyn Fn(String, String, RequestStatus) + Send + Sync> {
    Arc::new(move |session_id: String, request_id: String, status: RequestStatus| {
        let state = state.clone();
        tokio::spawn(async move {
            state.lock().await.tracker.mark(&session_id, &request_id, status);
        });
    })
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
