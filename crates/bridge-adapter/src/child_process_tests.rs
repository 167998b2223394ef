// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::trait_def::Adapter as _;
use std::time::Duration;

fn script_adapter(script: &str) -> (ChildProcessAdapter, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("fake_assistant.sh");
    std::fs::write(&script_path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    let adapter = ChildProcessAdapter::new(script_path, None, Duration::from_secs(5));
    (adapter, dir)
}

#[tokio::test]
async fn happy_path_emits_text_chunks_then_done() {
    let script = r#"#!/bin/sh
echo '{"type":"content_block_start","content_block":{"type":"text"}}'
echo '{"type":"content_block_delta","delta":{"type":"text_delta","text":"Hello "}}'
echo '{"type":"content_block_delta","delta":{"type":"text_delta","text":"world"}}'
echo '{"type":"result","is_error":false,"result":"Hello world"}'
"#;
    let (adapter, workspace) = script_adapter(script);
    let handle = adapter.create_session("s1", workspace.path().to_path_buf()).await.unwrap();
    let mut events = handle.take_events().unwrap();
    handle.send("hi", &[], None, None).await.unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first, AdapterEvent::text("Hello "));
    let second = events.recv().await.unwrap();
    assert_eq!(second, AdapterEvent::text("world"));
    let done = events.recv().await.unwrap();
    assert_eq!(done, AdapterEvent::Done { result: Some("Hello world".into()), attachments: Vec::new() });
}

#[tokio::test]
async fn crash_without_terminal_event_emits_adapter_crash_error() {
    let script = r#"#!/bin/sh
echo '{"type":"content_block_start","content_block":{"type":"text"}}'
echo 'not valid json, parse error, skipped'
exit 3
"#;
    let (adapter, workspace) = script_adapter(script);
    let handle = adapter.create_session("s1", workspace.path().to_path_buf()).await.unwrap();
    let mut events = handle.take_events().unwrap();
    handle.send("hi", &[], None, None).await.unwrap();

    let event = events.recv().await.unwrap();
    match event {
        AdapterEvent::Error { code, .. } => assert_eq!(code, "ADAPTER_CRASH"),
        other => panic!("expected crash error, got {other:?}"),
    }
}

#[tokio::test]
async fn collect_files_marker_bypasses_the_child_process() {
    let script = r#"#!/bin/sh
echo "this script should never run for a collect-files message" >&2
exit 1
"#;
    let (adapter, workspace) = script_adapter(script);
    std::fs::write(workspace.path().join("out.txt"), b"hi").unwrap();
    let handle = adapter.create_session("s1", workspace.path().to_path_buf()).await.unwrap();
    let mut events = handle.take_events().unwrap();

    let content = "Collect files task (platform-issued): go\nUPLOAD_URL=http://127.0.0.1:1 UPLOAD_TOKEN=tok\n";
    handle.send(content, &[], None, None).await.unwrap();

    // Upload will fail (nothing listening), so we expect NO_FILES_FOUND only
    // if the upload itself is swallowed as a failure — here there IS a real
    // file, so the chunk should report its upload outcome rather than the
    // child-script's stderr, proving the child was never spawned.
    let chunk = events.recv().await.unwrap();
    match chunk {
        AdapterEvent::Chunk { delta, .. } => {
            assert!(!delta.contains("never run"), "child process must not have run");
        }
        other => panic!("expected a text chunk, got {other:?}"),
    }
}

#[tokio::test]
async fn idle_timeout_kills_child_and_emits_error() {
    let script = r#"#!/bin/sh
echo '{"type":"content_block_start","content_block":{"type":"text"}}'
sleep 5
"#;
    let (adapter, workspace) = script_adapter_with_timeout(script, Duration::from_millis(50));
    let handle = adapter.create_session("s1", workspace.path().to_path_buf()).await.unwrap();
    let mut events = handle.take_events().unwrap();
    handle.send("hi", &[], None, None).await.unwrap();

    let event = events.recv().await.unwrap();
    match event {
        AdapterEvent::Error { code, .. } => assert_eq!(code, "IDLE_TIMEOUT"),
        other => panic!("expected idle timeout error, got {other:?}"),
    }
}

fn script_adapter_with_timeout(script: &str, timeout: Duration) -> (ChildProcessAdapter, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("fake_assistant.sh");
    std::fs::write(&script_path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    (ChildProcessAdapter::new(script_path, None, timeout), dir)
}
