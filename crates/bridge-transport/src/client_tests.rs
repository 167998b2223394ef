// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn replaced_close_code_is_terminal() {
    assert_eq!(terminal_lifecycle_for_close_code(4001), Some(LifecycleEvent::Replaced));
}

#[test]
fn token_revoked_close_code_is_terminal() {
    assert_eq!(terminal_lifecycle_for_close_code(4002), Some(LifecycleEvent::TokenRevoked));
}

#[test]
fn ordinary_close_codes_are_not_terminal() {
    assert_eq!(terminal_lifecycle_for_close_code(1000), None);
    assert_eq!(terminal_lifecycle_for_close_code(1006), None);
}

#[tokio::test]
async fn send_while_disconnected_is_a_silent_no_op() {
    let (tx, rx) = mpsc::unbounded_channel::<UpstreamFrame>();
    drop(rx); // simulate the writer task having torn down
    let transport = Transport {
        outbound_tx: tx,
        lifecycle_tx: broadcast::channel(4).0,
        connected: Arc::new(AtomicBool::new(false)),
        send_log_suppressed: Arc::new(Mutex::new(false)),
    };
    assert!(!transport.is_connected());
    transport.send(UpstreamFrame::Heartbeat { active_sessions: 0, uptime_ms: 0 });
    assert!(*transport.send_log_suppressed.lock(), "first drop while disconnected should flip the suppression flag");
}
