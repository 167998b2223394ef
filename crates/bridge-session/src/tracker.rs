// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dedup tracker for recently-seen `{session_id, request_id}` pairs.

use bridge_core::{RequestStatus, RequestTrackerEntry};
use std::collections::HashMap;

/// Default entry lifetime: 10 minutes.
pub const DEFAULT_TTL_MS: u64 = 600_000;

#[derive(Debug, Default)]
pub struct RequestTracker {
    entries: HashMap<(String, String), RequestTrackerEntry>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, session_id: &str, request_id: &str) -> bool {
        self.entries.contains_key(&(session_id.to_string(), request_id.to_string()))
    }

    /// Insert a fresh `active` entry, overwriting any existing one.
    pub fn insert_active(&mut self, session_id: &str, request_id: &str, now_epoch_ms: u64, ttl_ms: u64) {
        self.entries.insert(
            (session_id.to_string(), request_id.to_string()),
            RequestTrackerEntry {
                status: RequestStatus::Active,
                expires_at_epoch_ms: now_epoch_ms + ttl_ms,
                created_at_epoch_ms: now_epoch_ms,
            },
        );
    }

    /// Update an existing entry's status in place. A no-op if the pair was
    /// already pruned (e.g. a very slow adapter outliving the TTL).
    pub fn mark(&mut self, session_id: &str, request_id: &str, status: RequestStatus) {
        if let Some(entry) = self.entries.get_mut(&(session_id.to_string(), request_id.to_string())) {
            entry.status = status;
        }
    }

    /// Drop every entry whose `expires_at` has passed.
    pub fn prune_expired(&mut self, now_epoch_ms: u64) {
        self.entries.retain(|_, entry| entry.expires_at_epoch_ms > now_epoch_ms);
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
