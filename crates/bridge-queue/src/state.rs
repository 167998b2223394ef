// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted queue state shape.

use bridge_core::{LeaseId, QueueEntryId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CURRENT_VERSION: u32 = 1;

/// `"agent_id:session_id:request_id"`, the unique key for one in-flight
/// request across the whole runtime queue.
pub fn request_key(agent_id: &str, session_id: &str, request_id: &str) -> String {
    format!("{agent_id}:{session_id}:{request_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveLease {
    pub lease_id: LeaseId,
    pub request_key: String,
    pub pid: u32,
    pub acquired_at_epoch_ms: u64,
    pub lease_expires_at_epoch_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub queue_id: QueueEntryId,
    pub request_key: String,
    pub pid: u32,
    pub enqueued_at_epoch_ms: u64,
    pub deadline_at_epoch_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueState {
    pub version: u32,
    pub active: HashMap<String, ActiveLease>,
    pub queue: Vec<QueueEntry>,
    pub updated_at_epoch_ms: u64,
}

impl Default for QueueState {
    fn default() -> Self {
        Self { version: CURRENT_VERSION, active: HashMap::new(), queue: Vec::new(), updated_at_epoch_ms: 0 }
    }
}

/// Point-in-time counts of a [`QueueState`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueSnapshot {
    pub active_count: usize,
    pub queued_count: usize,
}

impl QueueState {
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot { active_count: self.active.len(), queued_count: self.queue.len() }
    }

    /// Remove active leases past their TTL or held by a dead pid, and queue
    /// entries past their deadline or held by a dead pid. Run on every
    /// lock acquisition so reclaim happens opportunistically rather than
    /// on a separate timer.
    pub fn evict_stale(&mut self, now_epoch_ms: u64, is_pid_alive: impl Fn(u32) -> bool) {
        self.active.retain(|_, lease| {
            lease.lease_expires_at_epoch_ms > now_epoch_ms && is_pid_alive(lease.pid)
        });
        self.queue.retain(|entry| {
            entry.deadline_at_epoch_ms > now_epoch_ms && is_pid_alive(entry.pid)
        });
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
