// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration tests: exercise the session manager wired to
//! a real filesystem workspace and a real upload endpoint, and the queue
//! admission path it sits on top of, the way a running supervisor would.

use bridge_adapter::{AdapterEvent, FakeAdapter};
use bridge_core::{FakeClock, QueueLimits};
use bridge_protocol::{ChunkKind, UpstreamFrame};
use bridge_session::SessionManager;
use bridge_upload::UploadClient;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

fn small_queue_limits() -> QueueLimits {
    QueueLimits { max_active_requests: 1, queue_wait_timeout_ms: 5_000, queue_max_length: 1 }
}

#[allow(clippy::too_many_arguments)]
fn new_manager(
    adapter: FakeAdapter,
    queue_limits: QueueLimits,
) -> (SessionManager<FakeClock>, mpsc::UnboundedReceiver<UpstreamFrame>, tempfile::TempDir, tempfile::TempDir) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let runtime_dir = tempfile::tempdir().unwrap();
    let projects_root = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        Arc::new(adapter),
        outbound_tx,
        UploadClient::new(),
        FakeClock::new(),
        runtime_dir.path().to_path_buf(),
        projects_root.path().to_path_buf(),
        "agent-1".into(),
        queue_limits,
        600_000,
    );
    (manager, outbound_rx, runtime_dir, projects_root)
}

/// One-shot raw HTTP server that accepts a single upload POST and replies
/// with a canned JSON body, returning its base URL.
async fn spawn_one_shot_upload_server(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let _ = socket.read(&mut buf).await;
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn happy_path_message_flows_from_dispatch_to_done_frame() {
    let adapter = FakeAdapter::new();
    let (manager, mut outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone(), small_queue_limits());

    manager.message("s1".into(), "r1".into(), "hello there".into(), None, None, None).await;
    assert_eq!(adapter.calls()[0].content, "hello there");

    adapter.push_event("s1", AdapterEvent::Chunk {
        kind: ChunkKind::Text,
        delta: "hi".into(),
        tool_name: None,
        tool_call_id: None,
    });
    let chunk = outbound_rx.recv().await.unwrap();
    assert!(matches!(chunk, UpstreamFrame::Chunk { delta, .. } if delta == "hi"));

    adapter.push_event("s1", AdapterEvent::Done { result: Some("done".into()), attachments: Vec::new() });
    let done = outbound_rx.recv().await.unwrap();
    match done {
        UpstreamFrame::Done { result, attachments, .. } => {
            assert_eq!(result.as_deref(), Some("done"));
            assert!(attachments.is_empty());
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test]
async fn files_written_into_the_workspace_during_a_turn_are_uploaded_as_attachments() {
    let adapter = FakeAdapter::new();
    let (manager, mut outbound_rx, _runtime_dir, projects_root) = new_manager(adapter.clone(), small_queue_limits());

    let upload_url = spawn_one_shot_upload_server(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 28\r\nConnection: close\r\n\r\n{\"url\":\"https://x/notes.md\"}",
    )
    .await;

    manager
        .message("s1".into(), "r1".into(), "write some notes".into(), None, Some(upload_url), Some("tok".into()))
        .await;

    let workspace = projects_root.path().join("s1");
    tokio::fs::write(workspace.join("notes.md"), b"written during the turn").await.unwrap();

    adapter.push_event("s1", AdapterEvent::Done { result: None, attachments: Vec::new() });
    let done = outbound_rx.recv().await.unwrap();
    match done {
        UpstreamFrame::Done { attachments, .. } => {
            assert_eq!(attachments.len(), 1);
            assert_eq!(attachments[0].name, "notes.md");
            assert_eq!(attachments[0].url, "https://x/notes.md");
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test]
async fn an_upload_failure_still_lets_the_done_frame_through_with_no_attachments() {
    let adapter = FakeAdapter::new();
    let (manager, mut outbound_rx, _runtime_dir, projects_root) = new_manager(adapter.clone(), small_queue_limits());

    manager
        .message(
            "s1".into(),
            "r1".into(),
            "write some notes".into(),
            None,
            Some("http://127.0.0.1:1/upload".into()),
            Some("tok".into()),
        )
        .await;

    let workspace = projects_root.path().join("s1");
    tokio::fs::write(workspace.join("notes.md"), b"written during the turn").await.unwrap();

    adapter.push_event("s1", AdapterEvent::Done { result: Some("done".into()), attachments: Vec::new() });
    let done = outbound_rx.recv().await.unwrap();
    match done {
        UpstreamFrame::Done { attachments, result, .. } => {
            assert!(attachments.is_empty());
            assert_eq!(result.as_deref(), Some("done"));
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelling_mid_stream_kills_the_adapter_session_without_a_terminal_frame() {
    let adapter = FakeAdapter::new();
    let (manager, mut outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone(), small_queue_limits());

    manager.message("s1".into(), "r1".into(), "start a long task".into(), None, None, None).await;
    adapter.push_event("s1", AdapterEvent::Chunk {
        kind: ChunkKind::Text,
        delta: "working".into(),
        tool_name: None,
        tool_call_id: None,
    });
    let _ = outbound_rx.recv().await.unwrap();

    manager.cancel("s1", "r1").await;
    assert_eq!(adapter.killed_sessions(), vec!["s1".to_string()]);
    assert_eq!(manager.active_session_count(), 0, "the pool entry is destroyed, not just killed");

    // A duplicate message for the same request id is still deduped even
    // after cancellation, since the tracker entry isn't cleared by cancel.
    manager.message("s1".into(), "r1".into(), "start a long task".into(), None, None, None).await;
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn reconnect_leaves_pooled_sessions_running_and_future_messages_reuse_them() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone(), small_queue_limits());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.handle_reconnect().await;

    manager.message("s1".into(), "r2".into(), "hello again".into(), None, None, None).await;
    assert_eq!(adapter.calls().len(), 2);
    assert!(adapter.killed_sessions().is_empty());
}

#[tokio::test]
async fn the_active_session_count_backs_a_shutdown_that_drains_every_pooled_session() {
    let adapter = FakeAdapter::new();
    let (manager, _outbound_rx, _runtime_dir, _projects_root) = new_manager(adapter.clone(), small_queue_limits());

    manager.message("s1".into(), "r1".into(), "hello".into(), None, None, None).await;
    manager.message("s2".into(), "r1".into(), "hello".into(), None, None, None).await;
    assert_eq!(manager.active_session_count(), 2);

    manager.shutdown().await;
    assert_eq!(manager.active_session_count(), 0);
    let mut killed = adapter.killed_sessions();
    killed.sort();
    assert_eq!(killed, vec!["s1".to_string(), "s2".to_string()]);
}

#[tokio::test]
async fn queue_admission_is_shared_across_sessions_under_the_same_agent() {
    use bridge_queue::{acquire, QueueError};

    let runtime_dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();

    // Hold the single active slot open, as a slow in-flight dispatch would.
    let held = acquire(runtime_dir.path(), &clock, "agent-1:s1:r1".into(), std::process::id(), 1, 0, 5_000, || false)
        .await
        .unwrap();

    let err = acquire(runtime_dir.path(), &clock, "agent-1:s2:r1".into(), std::process::id(), 1, 0, 5_000, || false)
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::QueueFull));

    held.release().await.unwrap();
    let lease =
        acquire(runtime_dir.path(), &clock, "agent-1:s2:r1".into(), std::process::id(), 1, 0, 5_000, || false)
            .await
            .unwrap();
    lease.release().await.unwrap();
}

#[tokio::test]
async fn a_queued_waiter_is_admitted_once_the_holder_releases_its_lease() {
    use bridge_queue::acquire;

    let runtime_dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();

    let holder =
        acquire(runtime_dir.path(), &clock, "agent-1:s1:r1".into(), std::process::id(), 1, 10, 60_000, || false)
            .await
            .unwrap();

    let waiter_dir = runtime_dir.path().to_path_buf();
    let waiter_clock = clock.clone();
    let waiter = tokio::spawn(async move {
        acquire(&waiter_dir, &waiter_clock, "agent-1:s2:r1".into(), std::process::id(), 1, 10, 60_000, || false).await
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    holder.release().await.unwrap();

    let lease = waiter.await.unwrap().unwrap();
    lease.release().await.unwrap();
}
