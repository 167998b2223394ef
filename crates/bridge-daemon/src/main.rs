// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor binary: parses configuration, constructs the configured
//! adapter, wires the transport and session manager together, and runs
//! until a shutdown signal arrives.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod env;

use anyhow::Context;
use bridge_adapter::{Adapter, ChildProcessAdapter, HttpSseAdapter};
use bridge_core::{AdapterKind, BridgeConfig};
use bridge_protocol::DownstreamFrame;
use bridge_session::SessionManager;
use bridge_transport::{LifecycleEvent, Transport, TransportConfig};
use std::sync::Arc;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env().context("loading bridge configuration")?;
    init_tracing(&config.log_level);
    env::log_auto_upgrade_intent();

    tracing::info!(agent_id = %config.agent_id, adapter_kind = ?config.adapter_kind, "starting agent bridge");

    let adapter = build_adapter(&config);
    let runtime_dir =
        bridge_core::config::runtime_state_dir().context("resolving runtime state directory")?;

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let manager = Arc::new(SessionManager::new(
        adapter,
        outbound_tx,
        bridge_upload::UploadClient::new(),
        bridge_core::SystemClock,
        runtime_dir,
        config.project_root.clone(),
        config.agent_id.to_string(),
        config.queue_limits,
        env::session_idle_ttl_ms(),
    ));
    manager.clone().spawn_idle_sweep();

    let heartbeat_manager = manager.clone();
    let (transport, downstream_rx) = Transport::spawn(
        TransportConfig {
            url: config.transport_url.clone(),
            agent_id: config.agent_id.to_string(),
            token: config.platform_token.clone(),
            adapter_type: adapter_type_label(config.adapter_kind).to_string(),
            capabilities: Vec::new(),
        },
        move || heartbeat_manager.active_session_count(),
    );

    spawn_outbound_forwarder(transport.clone(), outbound_rx);
    spawn_lifecycle_listener(transport.subscribe_lifecycle(), manager.clone());
    let dispatch_task = spawn_downstream_dispatch(downstream_rx, manager.clone());

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining");
    dispatch_task.abort();

    let drain_timeout = env::drain_timeout();
    if tokio::time::timeout(drain_timeout, manager.shutdown()).await.is_err() {
        tracing::warn!(
            timeout_ms = drain_timeout.as_millis() as u64,
            "session drain timed out, exiting with sessions still tearing down"
        );
    }

    tracing::info!("agent bridge stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn adapter_type_label(kind: AdapterKind) -> &'static str {
    match kind {
        AdapterKind::ChildProcess => "child_process",
        AdapterKind::HttpSse => "http_sse",
    }
}

fn build_adapter(config: &BridgeConfig) -> Arc<dyn Adapter> {
    match config.adapter_kind {
        AdapterKind::ChildProcess => {
            let sandbox_command =
                config.sandbox_command.as_ref().map(|cmd| cmd.split_whitespace().map(String::from).collect());
            Arc::new(ChildProcessAdapter::new(
                config.assistant_binary.clone(),
                sandbox_command,
                bridge_core::config::duration_ms_env("AGENT_BRIDGE_CLAUDE_IDLE_TIMEOUT_MS", 1_800_000, 60_000),
            ))
        }
        AdapterKind::HttpSse => Arc::new(HttpSseAdapter::new(env::gateway_url(config))),
    }
}

/// Drain `UpstreamFrame`s produced by the session manager onto the
/// transport's outbound queue.
fn spawn_outbound_forwarder(
    transport: Transport,
    mut outbound_rx: tokio::sync::mpsc::UnboundedReceiver<bridge_protocol::UpstreamFrame>,
) {
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            transport.send(frame);
        }
    });
}

/// Forward the transport's reconnect lifecycle event to the session manager;
/// every other lifecycle event is logged only.
fn spawn_lifecycle_listener(
    mut lifecycle_rx: broadcast::Receiver<LifecycleEvent>,
    manager: Arc<SessionManager<bridge_core::SystemClock>>,
) {
    tokio::spawn(async move {
        loop {
            match lifecycle_rx.recv().await {
                Ok(LifecycleEvent::Reconnected) => manager.handle_reconnect().await,
                Ok(event) => tracing::info!(?event, "transport lifecycle event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "lifecycle event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });
}

/// Dispatch validated downstream frames to the session manager. Each frame
/// is handled on its own task so a slow/queued request never blocks the
/// transport's read loop from delivering the next one.
fn spawn_downstream_dispatch(
    mut downstream_rx: tokio::sync::mpsc::UnboundedReceiver<DownstreamFrame>,
    manager: Arc<SessionManager<bridge_core::SystemClock>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = downstream_rx.recv().await {
            match frame {
                DownstreamFrame::Message {
                    session_id,
                    request_id,
                    content,
                    attachments: _,
                    client_id,
                    upload_url,
                    upload_token,
                } => {
                    let manager = manager.clone();
                    tokio::spawn(async move {
                        manager.message(session_id, request_id, content, client_id, upload_url, upload_token).await;
                    });
                }
                DownstreamFrame::Cancel { session_id, request_id } => {
                    let manager = manager.clone();
                    tokio::spawn(async move {
                        manager.cancel(&session_id, &request_id).await;
                    });
                }
                DownstreamFrame::Registered { .. } => {}
                DownstreamFrame::Unknown { tag, .. } => {
                    tracing::debug!(tag, "ignoring unknown downstream frame");
                }
            }
        }
    })
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler, falling back to SIGINT only");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
