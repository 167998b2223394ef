// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process adapter: each `send()` spawns the
//! configured assistant binary, streams its line-delimited JSON event
//! output through a [`StreamParser`], and enforces an idle timeout on the
//! running child.

use crate::collect_files;
use crate::event::AdapterEvent;
use crate::stream_parser::StreamParser;
use crate::trait_def::{Adapter, AdapterError, SessionBackend, SessionHandle, UploadCredentials};
use async_trait::async_trait;
use bridge_core::Attachment;
use bridge_upload::UploadClient;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

const CRASH_GRACE_DELAY: Duration = Duration::from_millis(50);
const STDERR_TAIL_LINES: usize = 20;

/// Flags appended to every invocation to request streaming line-delimited
/// JSON output and skip interactive confirmation prompts.
#[derive(Debug, Clone)]
pub struct InvocationFlags {
    pub streaming_format_flags: Vec<String>,
    pub skip_confirmation_flags: Vec<String>,
}

impl Default for InvocationFlags {
    fn default() -> Self {
        Self {
            streaming_format_flags: vec!["--output-format".into(), "stream-json".into()],
            skip_confirmation_flags: vec!["--dangerously-skip-permissions".into()],
        }
    }
}

#[derive(Clone)]
pub struct ChildProcessAdapter {
    binary: PathBuf,
    sandbox_command: Option<Vec<String>>,
    flags: InvocationFlags,
    idle_timeout: Duration,
    upload_client: UploadClient,
}

impl ChildProcessAdapter {
    pub fn new(binary: PathBuf, sandbox_command: Option<Vec<String>>, idle_timeout: Duration) -> Self {
        Self {
            binary,
            sandbox_command,
            flags: InvocationFlags::default(),
            idle_timeout,
            upload_client: UploadClient::new(),
        }
    }

    fn build_command(&self, workspace: &std::path::Path, content: &str) -> Command {
        let mut argv: Vec<String> = Vec::new();
        argv.extend(self.flags.streaming_format_flags.clone());
        argv.extend(self.flags.skip_confirmation_flags.clone());
        argv.push(content.to_string());

        let mut cmd = match &self.sandbox_command {
            Some(sandbox) if !sandbox.is_empty() => {
                let mut c = Command::new(&sandbox[0]);
                c.args(&sandbox[1..]);
                c.arg(&self.binary);
                c.args(&argv);
                c
            }
            _ => {
                let mut c = Command::new(&self.binary);
                c.args(&argv);
                c
            }
        };
        cmd.current_dir(workspace);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Adapter for ChildProcessAdapter {
    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    async fn create_session(
        &self,
        session_id: &str,
        workspace: PathBuf,
    ) -> Result<SessionHandle, AdapterError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let backend = ChildProcessBackend {
            adapter: self.clone(),
            session_id: session_id.to_string(),
            workspace,
            events_tx,
            current_child: Arc::new(Mutex::new(None)),
        };
        Ok(SessionHandle::new(Box::new(backend), events_rx))
    }
}

struct ChildProcessBackend {
    adapter: ChildProcessAdapter,
    session_id: String,
    workspace: PathBuf,
    events_tx: mpsc::UnboundedSender<AdapterEvent>,
    current_child: Arc<Mutex<Option<u32>>>,
}

#[async_trait]
impl SessionBackend for ChildProcessBackend {
    async fn send(
        &self,
        content: &str,
        _attachments: &[Attachment],
        upload_credentials: Option<UploadCredentials>,
        _client_id: Option<&str>,
    ) -> Result<(), AdapterError> {
        if let Some((url, token)) = collect_files::detect(content) {
            let (url, token) = upload_credentials
                .map(|c| (c.url, c.token))
                .unwrap_or((url, token));
            let events = collect_files::run(&self.workspace, &url, &token, &self.adapter.upload_client).await;
            for event in events {
                let _ = self.events_tx.send(event);
            }
            return Ok(());
        }

        let mut cmd = self.adapter.build_command(&self.workspace, content);
        let mut child = cmd.spawn().map_err(|e| AdapterError::SpawnFailed(e.to_string()))?;
        *self.current_child.lock() = child.id();

        let Some(stderr) = child.stderr.take() else {
            return Err(AdapterError::SpawnFailed("child stderr was not piped".into()));
        };
        let stderr_tail = spawn_stderr_collector(stderr);
        let terminal_emitted =
            run_stdout_pump(&mut child, self.adapter.idle_timeout, &self.events_tx, &self.session_id).await;

        let status = child.wait().await.ok();
        *self.current_child.lock() = None;

        if !terminal_emitted {
            tokio::time::sleep(CRASH_GRACE_DELAY).await;
            let tail = stderr_tail.await.unwrap_or_default();
            let message = match status {
                Some(status) if !status.success() => {
                    if tail.is_empty() {
                        format!("process exited with code {}", status.code().unwrap_or(-1))
                    } else {
                        tail
                    }
                }
                _ => {
                    if tail.is_empty() {
                        "process exited without a terminal event".to_string()
                    } else {
                        tail
                    }
                }
            };
            let _ = self
                .events_tx
                .send(AdapterEvent::Error { code: "ADAPTER_CRASH".into(), message });
        }

        Ok(())
    }

    async fn kill(&self) {
        let pid = self.current_child.lock().take();
        let Some(pid) = pid else { return };
        tracing::info!(session_id = %self.session_id, pid, "killing adapter child process");
        let nix_pid = nix::unistd::Pid::from_raw(pid as i32);
        if let Err(e) = nix::sys::signal::kill(nix_pid, nix::sys::signal::Signal::SIGTERM) {
            tracing::debug!(session_id = %self.session_id, pid, error = %e, "SIGTERM failed, child likely already exited");
            return;
        }

        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(KILL_ESCALATION_DELAY).await;
            if pid_is_alive(pid) {
                tracing::warn!(session_id = %session_id, pid, "child ignored SIGTERM, escalating to SIGKILL");
                if let Err(e) = nix::sys::signal::kill(nix_pid, nix::sys::signal::Signal::SIGKILL) {
                    tracing::debug!(session_id = %session_id, pid, error = %e, "SIGKILL failed, child likely already exited");
                }
            }
        });
    }
}

/// How long a killed child is given to exit on `SIGTERM` before `SIGKILL`.
const KILL_ESCALATION_DELAY: Duration = Duration::from_secs(5);

/// Whether `pid` refers to a running process. Signal 0 sends nothing; only
/// `ESRCH` means the process is gone.
fn pid_is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Reads one stdout line at a time, parsing and forwarding events, resetting
/// the idle timer on every parsed line. Returns whether a terminal event
/// (`done` or `error`) was emitted.
async fn run_stdout_pump(
    child: &mut Child,
    idle_timeout: Duration,
    events_tx: &mpsc::UnboundedSender<AdapterEvent>,
    session_id: &str,
) -> bool {
    let Some(stdout) = child.stdout.take() else {
        tracing::error!(session_id, "child stdout was not piped");
        return false;
    };
    let mut lines = BufReader::new(stdout).lines();
    let mut parser = StreamParser::new();
    let mut terminal_emitted = false;

    loop {
        let next_line = tokio::time::timeout(idle_timeout, lines.next_line()).await;
        let line = match next_line {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                tracing::warn!(session_id, error = %e, "adapter stdout read error");
                break;
            }
            Err(_) => {
                tracing::warn!(session_id, "adapter idle timeout, killing child");
                let _ = child.kill().await;
                let _ = events_tx.send(AdapterEvent::Error {
                    code: "IDLE_TIMEOUT".into(),
                    message: "assistant produced no output within the idle timeout".into(),
                });
                return true;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        let parsed: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(session_id, error = %e, "skipping unparseable adapter line");
                continue;
            }
        };
        for event in parser.feed(&parsed) {
            if matches!(event, AdapterEvent::Done { .. } | AdapterEvent::Error { .. }) {
                terminal_emitted = true;
            }
            let _ = events_tx.send(event);
        }
    }

    terminal_emitted
}

fn spawn_stderr_collector(
    stderr: tokio::process::ChildStderr,
) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        while let Ok(Some(line)) = lines.next_line().await {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail.into_iter().collect::<Vec<_>>().join("\n")
    })
}
