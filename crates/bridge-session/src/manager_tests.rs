// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bridge_adapter::{AdapterEvent, FakeAdapter};
use bridge_core::FakeClock;

fn test_queue_limits() -> QueueLimits {
    QueueLimits { max_active_requests: 4, queue_wait_timeout_ms: 5_000, queue_max_length: 8 }
}

/// Build a manager for one test. The returned tempdirs must be kept alive
/// for as long as the manager is used; binding them at the call site (even
/// as `_name`) is enough, since only their `Drop` impl matters.
fn new_manager(
    adapter: FakeAdapter,
) -> (SessionManager<FakeClock>, mpsc::UnboundedReceiver<UpstreamFrame>, tempfile::TempDir, tempfile::TempDir) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let runtime_dir = tempfile::tempdir().expect("tempdir");
    let projects_root = tempfile::tempdir().expect("tempdir");
    let manager = SessionManager::new(
        Arc::new(adapter),
        outbound_tx,
        UploadClient::new(),
        FakeClock::new(),
        runtime_dir.path().to_path_buf(),
        projects_root.path().to_path_buf(),
        "agent-1".into(),
        test_queue_limits(),
        600_000,
    );
    (manager, outbound_rx, runtime_dir, projects_root)
}

#[tokio::test]
async fn happy_path_sends_through_the_adapter_and_forwards_the_done_frame() {
    let adapter = FakeAdapter::new();
    let (manager, mut outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].content, "hello");

    adapter.push_event("s1", AdapterEvent::Done { result: Some("hi".into()), attachments: Vec::new() });
    let frame = outbound_rx.recv().await.expect("done frame");
    assert!(matches!(frame, UpstreamFrame::Done { .. }));
}

#[tokio::test]
async fn a_duplicate_request_id_is_dropped_without_a_second_adapter_call() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.message("s1".into(), "r1".into(), "hello again".into(), None, None, None).await;

    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn cancel_kills_the_session_currently_attributed_to_that_request() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.cancel("s1", "r1").await;

    assert_eq!(adapter.killed_sessions(), vec!["s1".to_string()]);
    assert_eq!(manager.active_session_count(), 0);

    // The pool entry was destroyed, not just killed: a later message for the
    // same session id creates a brand new adapter session.
    manager.message("s1".into(), "r2".into(), "hello again".into(), None, None, None).await;
    assert_eq!(adapter.calls().len(), 2);
}

#[tokio::test]
async fn cancel_on_a_different_in_flight_request_does_not_kill_the_session() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.cancel("s1", "some-other-request").await;

    assert!(adapter.killed_sessions().is_empty());
}

#[tokio::test]
async fn a_new_logical_session_instance_tears_down_the_previous_one() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    manager.message("skillshot:alice:agent:uuid-1".into(), "r1".into(), "hi".into(), None, None, None).await;
    manager.message("skillshot:alice:agent:uuid-2".into(), "r2".into(), "hi".into(), None, None, None).await;

    assert_eq!(adapter.killed_sessions(), vec!["skillshot:alice:agent:uuid-1".to_string()]);
}

#[tokio::test]
async fn active_session_count_tracks_pool_inserts_and_shutdown() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    assert_eq!(manager.active_session_count(), 0);
    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.message("s2".into(), "r2".into(), "hello".into(), None, None, None).await;
    assert_eq!(manager.active_session_count(), 2);

    manager.shutdown().await;
    assert_eq!(manager.active_session_count(), 0);
    let mut killed = adapter.killed_sessions();
    killed.sort();
    assert_eq!(killed, vec!["s1".to_string(), "s2".to_string()]);
}

#[tokio::test]
async fn reconnect_hook_does_not_disturb_the_pool() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.handle_reconnect().await;

    assert_eq!(adapter.calls().len(), 1);
}
