// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `acquire()` and the lease handle it returns.

use crate::error::QueueError;
use crate::liveness::is_pid_alive;
use crate::lock::with_locked_state;
use crate::state::{ActiveLease, QueueEntry};
use bridge_core::{Clock, LeaseId, QueueEntryId};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const POLL_INTERVAL_MS: u64 = 100;
pub const LEASE_TTL_MS: u64 = 15_000;
pub const LEASE_HEARTBEAT_MS: u64 = 5_000;

enum LoopOutcome {
    Admitted(LeaseId),
    Attached(LeaseId),
    Cancelled,
    TimedOut,
    Wait,
}

/// Acquire an active-request lease for `request_key`, queueing and polling
/// until admitted, timed out, cancelled, or aborted via `is_aborted`.
pub async fn acquire<C: Clock>(
    runtime_dir: &Path,
    clock: &C,
    request_key: String,
    pid: u32,
    max_active_requests: usize,
    queue_max_length: usize,
    queue_wait_timeout_ms: u64,
    mut is_aborted: impl FnMut() -> bool,
) -> Result<Lease<C>, QueueError> {
    let deadline_at_epoch_ms = clock.epoch_ms() + queue_wait_timeout_ms;

    {
        let request_key = request_key.clone();
        let now = clock.epoch_ms();
        with_locked_state(runtime_dir, clock, move |state| {
            state.evict_stale(now, is_pid_alive);

            let duplicate = state.active.contains_key(&request_key)
                || state.queue.iter().any(|e| e.request_key == request_key);
            if duplicate {
                return Err(QueueError::QueueCancelled);
            }
            if state.queue.len() >= queue_max_length {
                return Err(QueueError::QueueFull);
            }
            state.queue.push(QueueEntry {
                queue_id: QueueEntryId::new(),
                request_key,
                pid,
                enqueued_at_epoch_ms: clock.epoch_ms(),
                deadline_at_epoch_ms,
            });
            Ok(())
        })
        .await??;
    }

    loop {
        if is_aborted() {
            let request_key = request_key.clone();
            let _ = with_locked_state(runtime_dir, clock, move |state| {
                state.queue.retain(|e| e.request_key != request_key);
            })
            .await;
            return Err(QueueError::QueueAborted);
        }

        let outcome = {
            let request_key = request_key.clone();
            let now = clock.epoch_ms();
            with_locked_state(runtime_dir, clock, move |state| {
                state.evict_stale(now, is_pid_alive);

                let queue_pos = state.queue.iter().position(|e| e.request_key == request_key);
                let Some(pos) = queue_pos else {
                    return match state.active.get(&request_key) {
                        Some(lease) => LoopOutcome::Attached(lease.lease_id.clone()),
                        None => LoopOutcome::Cancelled,
                    };
                };

                if pos == 0 && state.active.len() < max_active_requests {
                    let entry = state.queue.remove(0);
                    let lease_id = LeaseId::new();
                    state.active.insert(
                        entry.request_key.clone(),
                        ActiveLease {
                            lease_id: lease_id.clone(),
                            request_key: entry.request_key,
                            pid: entry.pid,
                            acquired_at_epoch_ms: now,
                            lease_expires_at_epoch_ms: now + LEASE_TTL_MS,
                        },
                    );
                    return LoopOutcome::Admitted(lease_id);
                }

                if state.queue[pos].deadline_at_epoch_ms <= now {
                    state.queue.remove(pos);
                    return LoopOutcome::TimedOut;
                }

                LoopOutcome::Wait
            })
            .await?
        };

        match outcome {
            LoopOutcome::Admitted(lease_id) | LoopOutcome::Attached(lease_id) => {
                return Ok(Lease::new(runtime_dir.to_path_buf(), clock.clone(), request_key, lease_id));
            }
            LoopOutcome::Cancelled => return Err(QueueError::QueueCancelled),
            LoopOutcome::TimedOut => return Err(QueueError::QueueTimeout),
            LoopOutcome::Wait => tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await,
        }
    }
}

/// Remove a still-queued `request_key` without waiting for its turn.
pub async fn cancel_queued<C: Clock>(
    runtime_dir: &Path,
    clock: &C,
    request_key: &str,
) -> Result<(), QueueError> {
    let request_key = request_key.to_string();
    with_locked_state(runtime_dir, clock, move |state| {
        state.queue.retain(|e| e.request_key != request_key);
    })
    .await
}

/// An active-slot lease. Dropping it stops any running heartbeat but does
/// NOT release the lease from disk — callers must `release()` explicitly.
/// `Drop` cannot run async code, so it can only stop the heartbeat task;
/// the disk-side teardown needs an explicit awaited call.
pub struct Lease<C: Clock> {
    runtime_dir: PathBuf,
    clock: C,
    request_key: String,
    lease_id: LeaseId,
    heartbeat: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<C: Clock> Lease<C> {
    fn new(runtime_dir: PathBuf, clock: C, request_key: String, lease_id: LeaseId) -> Self {
        Self { runtime_dir, clock, request_key, lease_id, heartbeat: Mutex::new(None) }
    }

    pub fn lease_id(&self) -> &LeaseId {
        &self.lease_id
    }

    /// Remove the active entry under lock. Idempotent: releasing an
    /// already-released or reclaimed lease is a no-op.
    pub async fn release(&self) -> Result<(), QueueError> {
        self.stop_heartbeat();
        let request_key = self.request_key.clone();
        with_locked_state(&self.runtime_dir, &self.clock, move |state| {
            state.active.remove(&request_key);
        })
        .await
    }

    /// Extend `lease_expires_at` by the TTL every [`LEASE_HEARTBEAT_MS`]
    /// until `release()` stops it.
    pub fn start_heartbeat(&self) {
        self.stop_heartbeat();
        let runtime_dir = self.runtime_dir.clone();
        let clock = self.clock.clone();
        let request_key = self.request_key.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(LEASE_HEARTBEAT_MS)).await;
                let request_key = request_key.clone();
                let extended_to = clock.epoch_ms() + LEASE_TTL_MS;
                let result = with_locked_state(&runtime_dir, &clock, move |state| {
                    if let Some(lease) = state.active.get_mut(&request_key) {
                        lease.lease_expires_at_epoch_ms = extended_to;
                    }
                })
                .await;
                if let Err(e) = result {
                    tracing::warn!(request_key = %request_key, error = %e, "lease heartbeat failed to persist");
                }
            }
        });
        *self.heartbeat.lock() = Some(handle);
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }
    }
}

impl<C: Clock> Drop for Lease<C> {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}

#[cfg(test)]
#[path = "acquire_tests.rs"]
mod tests;
