// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access and process-scoped configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::id::AgentId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("could not resolve a home directory for the runtime queue state dir")]
    NoHomeDir,
}

/// Which `Adapter` implementation the supervisor should construct.
///
/// A child-process variant and an HTTP/SSE variant are supported; the
/// choice between them is resolved via `AGENT_BRIDGE_ADAPTER_KIND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    ChildProcess,
    HttpSse,
}

impl AdapterKind {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "child_process" => Ok(Self::ChildProcess),
            "http_sse" => Ok(Self::HttpSse),
            other => Err(ConfigError::InvalidValue {
                name: "AGENT_BRIDGE_ADAPTER_KIND",
                value: other.to_string(),
            }),
        }
    }
}

/// Per-host runtime queue admission limits.
#[derive(Debug, Clone, Copy)]
pub struct QueueLimits {
    pub max_active_requests: usize,
    pub queue_wait_timeout_ms: u64,
    pub queue_max_length: usize,
}

impl Default for QueueLimits {
    fn default() -> Self {
        Self { max_active_requests: 4, queue_wait_timeout_ms: 600_000, queue_max_length: 32 }
    }
}

/// Process-scoped configuration, loaded once at supervisor startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub agent_id: AgentId,
    pub platform_token: String,
    pub transport_url: String,
    pub adapter_kind: AdapterKind,
    pub assistant_binary: PathBuf,
    pub project_root: PathBuf,
    pub sandbox_command: Option<String>,
    pub queue_limits: QueueLimits,
    pub log_level: String,
}

impl BridgeConfig {
    /// Load configuration from the process environment.
    ///
    /// `AGENT_BRIDGE_AGENT_ID`, when unset, generates a fresh stable identity
    /// — callers that need persistence across restarts must set it
    /// explicitly; an on-disk identity registry is out of scope here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let agent_id = match std::env::var("AGENT_BRIDGE_AGENT_ID") {
            Ok(s) if !s.is_empty() => AgentId::from_string(s),
            _ => AgentId::new(),
        };
        let platform_token = require_var("AGENT_BRIDGE_TOKEN")?;
        let transport_url = require_var("AGENT_BRIDGE_URL")?;
        let adapter_kind = match std::env::var("AGENT_BRIDGE_ADAPTER_KIND") {
            Ok(s) => AdapterKind::parse(&s)?,
            Err(_) => AdapterKind::ChildProcess,
        };
        let assistant_binary = std::env::var("AGENT_BRIDGE_ASSISTANT_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("claude"));
        let project_root = std::env::var("AGENT_BRIDGE_PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let sandbox_command = std::env::var("AGENT_BRIDGE_SANDBOX_COMMAND").ok().filter(|s| !s.is_empty());

        let queue_limits = QueueLimits {
            max_active_requests: env_usize("AGENT_BRIDGE_QUEUE_MAX_ACTIVE", 4),
            queue_wait_timeout_ms: env_u64("AGENT_BRIDGE_QUEUE_WAIT_TIMEOUT_MS", 600_000),
            queue_max_length: env_usize("AGENT_BRIDGE_QUEUE_MAX_LENGTH", 32),
        };

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            agent_id,
            platform_token,
            transport_url,
            adapter_kind,
            assistant_binary,
            project_root,
            sandbox_command,
            queue_limits,
            log_level,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Parse a millisecond duration from an env var, clamped to a minimum and
/// falling back to `default_ms` when unset or unparsable.
///
/// Used for `AGENT_BRIDGE_CLAUDE_IDLE_TIMEOUT_MS` (min 60_000, default
/// 1_800_000) and `AGENT_BRIDGE_SESSION_IDLE_TTL_MS` (min 60_000, default
/// 600_000).
pub fn duration_ms_env(name: &str, default_ms: u64, min_ms: u64) -> Duration {
    let ms = std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default_ms);
    Duration::from_millis(ms.max(min_ms))
}

/// Resolve `<home>/.agent-mesh/runtime/`, honoring `AGENT_BRIDGE_STATE_DIR`.
pub fn runtime_state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("AGENT_BRIDGE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHomeDir)?;
    Ok(PathBuf::from(home).join(".agent-mesh").join("runtime"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
