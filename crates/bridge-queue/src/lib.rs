// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local, cross-process admission queue bounding concurrent and queued
//! requests per host, backed by a lock-directory-guarded JSON state file
//! so every bridge process sees the same counts.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod acquire;
mod error;
mod liveness;
mod lock;
mod state;

pub use acquire::{acquire, cancel_queued, Lease, LEASE_HEARTBEAT_MS, LEASE_TTL_MS, POLL_INTERVAL_MS};
pub use error::QueueError;
pub use liveness::is_pid_alive;
pub use state::{request_key, ActiveLease, QueueEntry, QueueSnapshot, QueueState, CURRENT_VERSION};

use bridge_core::Clock;
use std::path::Path;

/// Read-only point-in-time view of the queue, for status/diagnostics.
pub async fn snapshot<C: Clock>(runtime_dir: &Path, clock: &C) -> Result<QueueSnapshot, QueueError> {
    lock::with_locked_state(runtime_dir, clock, |state| state.snapshot()).await
}
