// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::trait_def::Adapter as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn spawn_sse_server(sse_body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let _ = socket.read(&mut buf).await;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            sse_body.len(),
            sse_body,
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/chat")
}

#[tokio::test]
async fn streams_delta_content_then_done_on_sentinel() {
    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
               data: [DONE]\n\n";
    let url = spawn_sse_server(sse).await;
    let adapter = HttpSseAdapter::new(url);
    let handle = adapter.create_session("s1", std::env::temp_dir()).await.unwrap();
    let mut events = handle.take_events().unwrap();
    handle.send("hi", &[], None, None).await.unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first, AdapterEvent::text("Hel"));
    let second = events.recv().await.unwrap();
    assert_eq!(second, AdapterEvent::text("lo"));
    let done = events.recv().await.unwrap();
    assert_eq!(done, AdapterEvent::Done { result: Some("Hello".into()), attachments: Vec::new() });
}

#[test]
fn extract_delta_content_reads_openai_shape() {
    let data = r#"{"choices":[{"delta":{"content":"hi"}}]}"#;
    assert_eq!(extract_delta_content(data), Some("hi".to_string()));
}

#[test]
fn extract_delta_content_returns_none_for_role_only_deltas() {
    let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
    assert_eq!(extract_delta_content(data), None);
}

#[tokio::test]
async fn collect_files_marker_bypasses_the_gateway_request() {
    let adapter = HttpSseAdapter::new("http://127.0.0.1:1/unused".to_string());
    let dir = tempfile::tempdir().unwrap();
    let handle = adapter.create_session("s1", dir.path().to_path_buf()).await.unwrap();
    let mut events = handle.take_events().unwrap();

    let content = "Collect files task (platform-issued): go\nUPLOAD_URL=http://127.0.0.1:1 UPLOAD_TOKEN=tok\n";
    handle.send(content, &[], None, None).await.unwrap();

    let chunk = events.recv().await.unwrap();
    assert_eq!(chunk, AdapterEvent::text("NO_FILES_FOUND"));
}
