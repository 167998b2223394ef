// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport to the platform.
//!
//! Maintains at most one live connection for this agent id: registers,
//! heartbeats, and reconnects with exponential backoff. Modeled on the
//! coop event bridge's connect/read-loop/reconnect shape, generalized from a
//! Unix-socket subscription to an authenticated platform WebSocket.

use crate::backoff::ReconnectBackoff;
use bridge_protocol::{decode, encode, DownstreamFrame, UpstreamFrame, PROTOCOL_VERSION};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(15);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLOSE_CODE_REPLACED: u16 = 4001;
const CLOSE_CODE_TOKEN_REVOKED: u16 = 4002;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("registration timed out waiting for `registered`")]
    RegistrationTimeout,
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),
    #[error("websocket connect failed: {0}")]
    ConnectFailed(String),
}

/// Connection lifecycle events surfaced to the session manager / supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connected,
    Disconnected,
    Reconnected,
    Replaced,
    TokenRevoked,
    Closed,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub agent_id: String,
    pub token: String,
    pub adapter_type: String,
    pub capabilities: Vec<String>,
}

/// Handle to a running transport. Cloning shares the same outbound channel
/// and lifecycle broadcaster.
#[derive(Clone)]
pub struct Transport {
    outbound_tx: mpsc::UnboundedSender<UpstreamFrame>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    connected: Arc<AtomicBool>,
    send_log_suppressed: Arc<Mutex<bool>>,
}

impl Transport {
    /// Spawn the transport's connect/reconnect/heartbeat task. Returns the
    /// handle and the single downstream frame receiver; validated downstream
    /// frames are delivered to that one receiver.
    pub fn spawn(
        config: TransportConfig,
        active_sessions: impl Fn() -> u32 + Send + Sync + 'static,
    ) -> (Self, mpsc::UnboundedReceiver<DownstreamFrame>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (downstream_tx, downstream_rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, _) = broadcast::channel(32);
        let connected = Arc::new(AtomicBool::new(false));
        let send_log_suppressed = Arc::new(Mutex::new(false));

        let handle = Transport {
            outbound_tx,
            lifecycle_tx: lifecycle_tx.clone(),
            connected: connected.clone(),
            send_log_suppressed: send_log_suppressed.clone(),
        };

        tokio::spawn(run(
            config,
            outbound_rx,
            downstream_tx,
            lifecycle_tx,
            connected,
            send_log_suppressed,
            Arc::new(active_sessions),
        ));

        (handle, downstream_rx)
    }

    /// Subscribe to lifecycle events. Each subscriber gets its own queue.
    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle_tx.subscribe()
    }

    /// Enqueue an upstream frame. A no-op while disconnected; logs at most
    /// once per disconnect period.
    pub fn send(&self, frame: UpstreamFrame) {
        if !self.connected.load(Ordering::SeqCst) {
            let mut suppressed = self.send_log_suppressed.lock();
            if !*suppressed {
                tracing::warn!("dropping upstream frame: transport is disconnected");
                *suppressed = true;
            }
            return;
        }
        // The writer task may have torn down between the load above and
        // here; an unbounded send to a closed channel is silently dropped
        // by waking no one, so no further check is needed.
        let _ = self.outbound_tx.send(frame);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

enum LoopExit {
    Lost,
    Terminal(LifecycleEvent),
    Intentional,
}

async fn run(
    config: TransportConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<UpstreamFrame>,
    downstream_tx: mpsc::UnboundedSender<DownstreamFrame>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    connected: Arc<AtomicBool>,
    send_log_suppressed: Arc<Mutex<bool>>,
    active_sessions: Arc<dyn Fn() -> u32 + Send + Sync>,
) {
    let mut backoff = ReconnectBackoff::new();
    let mut ever_connected = false;

    loop {
        match connect_and_register(&config).await {
            Ok(ws) => {
                backoff.reset();
                connected.store(true, Ordering::SeqCst);
                *send_log_suppressed.lock() = false;

                let event =
                    if ever_connected { LifecycleEvent::Reconnected } else { LifecycleEvent::Connected };
                ever_connected = true;
                tracing::info!(agent_id = %config.agent_id, ?event, "transport connected");
                let _ = lifecycle_tx.send(event);

                let exit = session_loop(
                    ws,
                    &mut outbound_rx,
                    &downstream_tx,
                    active_sessions.as_ref(),
                )
                .await;

                connected.store(false, Ordering::SeqCst);

                match exit {
                    LoopExit::Terminal(event) => {
                        tracing::warn!(agent_id = %config.agent_id, ?event, "transport closed terminally");
                        let _ = lifecycle_tx.send(event);
                        return;
                    }
                    LoopExit::Intentional => {
                        let _ = lifecycle_tx.send(LifecycleEvent::Closed);
                        return;
                    }
                    LoopExit::Lost => {
                        tracing::warn!(agent_id = %config.agent_id, "transport connection lost");
                        let _ = lifecycle_tx.send(LifecycleEvent::Disconnected);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(agent_id = %config.agent_id, error = %e, "connect/register failed");
            }
        }

        let delay = backoff.next_delay();
        tokio::time::sleep(delay).await;
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect_and_register(config: &TransportConfig) -> Result<WsStream, TransportError> {
    let url = format!(
        "{}{}agent_id={}",
        config.url,
        if config.url.contains('?') { '&' } else { '?' },
        config.agent_id
    );
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

    let register = UpstreamFrame::Register {
        agent_id: config.agent_id.clone(),
        token: config.token.clone(),
        protocol_version: PROTOCOL_VERSION,
        adapter_type: config.adapter_type.clone(),
        capabilities: config.capabilities.clone(),
    };
    let text = encode(&register).map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
    ws.send(Message::Text(text))
        .await
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

    let registered = tokio::time::timeout(REGISTRATION_TIMEOUT, wait_for_registered(&mut ws))
        .await
        .map_err(|_| TransportError::RegistrationTimeout)??;

    match registered {
        DownstreamFrame::Registered { status, reason: _ } if status == "ok" => Ok(ws),
        DownstreamFrame::Registered { reason, .. } => {
            Err(TransportError::RegistrationRejected(reason.unwrap_or_else(|| "rejected".into())))
        }
        _ => Err(TransportError::RegistrationRejected("unexpected frame before registered".into())),
    }
}

async fn wait_for_registered(ws: &mut WsStream) -> Result<DownstreamFrame, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => match decode::<DownstreamFrame>(&text) {
                Ok(frame) => return Ok(frame),
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring unparseable frame before registration");
                }
            },
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::ConnectFailed(e.to_string())),
            None => return Err(TransportError::ConnectFailed("stream closed before registered".into())),
        }
    }
}

/// Maps a WebSocket close code to a terminal lifecycle event. Returns `None`
/// for any code that should instead trigger a reconnect.
fn terminal_lifecycle_for_close_code(code: u16) -> Option<LifecycleEvent> {
    match code {
        CLOSE_CODE_REPLACED => Some(LifecycleEvent::Replaced),
        CLOSE_CODE_TOKEN_REVOKED => Some(LifecycleEvent::TokenRevoked),
        _ => None,
    }
}

async fn session_loop(
    mut ws: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<UpstreamFrame>,
    downstream_tx: &mpsc::UnboundedSender<DownstreamFrame>,
    active_sessions: &(dyn Fn() -> u32 + Send + Sync),
) -> LoopExit {
    let started_at = Instant::now();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let frame = UpstreamFrame::Heartbeat {
                    active_sessions: active_sessions(),
                    uptime_ms: started_at.elapsed().as_millis() as u64,
                };
                if let Ok(text) = encode(&frame) {
                    if ws.send(Message::Text(text)).await.is_err() {
                        return LoopExit::Lost;
                    }
                }
                if ws.send(Message::Ping(Vec::new())).await.is_err() {
                    return LoopExit::Lost;
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(frame) => {
                        let text = match encode(&frame) {
                            Ok(t) => t,
                            Err(e) => {
                                tracing::error!(error = %e, "failed to encode outbound frame");
                                continue;
                            }
                        };
                        if ws.send(Message::Text(text)).await.is_err() {
                            return LoopExit::Lost;
                        }
                    }
                    None => return LoopExit::Intentional,
                }
            }
            incoming = ws.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match decode::<DownstreamFrame>(&text) {
                            Ok(DownstreamFrame::Unknown { tag, .. }) => {
                                tracing::debug!(tag, "ignoring unknown downstream frame type");
                            }
                            Ok(frame) => {
                                let _ = downstream_tx.send(frame);
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "ignoring unparseable downstream frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(event) = frame.and_then(|f| terminal_lifecycle_for_close_code(u16::from(f.code))) {
                            return LoopExit::Terminal(event);
                        }
                        return LoopExit::Lost;
                    }
                    Some(Ok(_)) => {} // Ping/Pong/Binary — ignore
                    Some(Err(_)) | None => return LoopExit::Lost,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
