// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon binary. Everything
//! that shapes the in-process runtime (`BridgeConfig`) lives in
//! `bridge_core::config`; this module covers the handful of knobs that are
//! specific to the supervisor's own boot/shutdown sequence.

use bridge_core::{config::duration_ms_env, BridgeConfig};
use std::time::Duration;

/// Bound on how long shutdown waits for `SessionManager::shutdown` to finish
/// destroying pooled adapter sessions before the process exits anyway.
pub fn drain_timeout() -> Duration {
    duration_ms_env("AGENT_BRIDGE_DRAIN_TIMEOUT_MS", 5_000, 0)
}

/// How long an adapter session may sit idle before the idle sweep evicts it.
pub fn session_idle_ttl_ms() -> u64 {
    duration_ms_env("AGENT_BRIDGE_SESSION_IDLE_TTL_MS", 600_000, 60_000).as_millis() as u64
}

/// Gateway URL for the HTTP/SSE adapter variant. Distinct from the platform
/// transport URL (`BridgeConfig::transport_url`) since the assistant gateway
/// and the bridge's own signaling channel are not necessarily the same host;
/// falls back to the transport URL when unset, which is the common case for
/// a bridge fronting a single co-located gateway.
pub fn gateway_url(config: &BridgeConfig) -> String {
    std::env::var("AGENT_BRIDGE_GATEWAY_URL").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| config.transport_url.clone())
}

/// `AGENT_MESH_AUTO_UPGRADE` governs whether the surrounding mesh supervisor
/// should pull a newer bridge build; the upgrade mechanism itself lives
/// outside this binary, so all we do here is log that the flag was seen.
pub fn log_auto_upgrade_intent() {
    if std::env::var("AGENT_MESH_AUTO_UPGRADE").ok().as_deref() == Some("1") {
        tracing::info!("AGENT_MESH_AUTO_UPGRADE=1 observed; auto-upgrade is handled outside this process");
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
