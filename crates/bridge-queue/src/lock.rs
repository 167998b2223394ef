// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process lock-by-directory protocol: preferred over advisory file
//! locks so it works uniformly across hosts without relying on `flock`
//! support. Every bridge process on the host shares the same runtime
//! directory; mutating the queue state always happens under this lock.

use crate::error::QueueError;
use crate::state::QueueState;
use bridge_core::Clock;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOCK_DIR_NAME: &str = "queue.lock";
const STATE_FILE_NAME: &str = "queue-state.json";
const LOCK_STALE_MS: u64 = 30_000;
const LOCK_RETRY_MS: u64 = 25;
const LOCK_WAIT_MS: u64 = 10_000;

struct LockGuard {
    lock_path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir(&self.lock_path) {
            tracing::warn!(lock_path = %self.lock_path.display(), error = %e, "failed to release queue lock");
        }
    }
}

async fn acquire_lock_dir<C: Clock>(runtime_dir: &Path, clock: &C) -> Result<LockGuard, QueueError> {
    std::fs::create_dir_all(runtime_dir)?;
    let lock_path = runtime_dir.join(LOCK_DIR_NAME);
    let deadline = clock.now() + Duration::from_millis(LOCK_WAIT_MS);

    loop {
        match create_lock_dir(&lock_path) {
            Ok(()) => return Ok(LockGuard { lock_path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_lock_stale(&lock_path) {
                    let _ = std::fs::remove_dir(&lock_path);
                    continue;
                }
            }
            Err(e) => return Err(QueueError::Io(e)),
        }

        if clock.now() >= deadline {
            return Err(QueueError::LockTimeout);
        }
        tokio::time::sleep(Duration::from_millis(LOCK_RETRY_MS)).await;
    }
}

fn is_lock_stale(lock_path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(lock_path) else { return true };
    let Ok(modified) = meta.modified() else { return false };
    is_lock_stale_at(modified, std::time::SystemTime::now(), Duration::from_millis(LOCK_STALE_MS))
}

fn is_lock_stale_at(modified: std::time::SystemTime, now: std::time::SystemTime, stale_after: Duration) -> bool {
    now.duration_since(modified).map(|age| age > stale_after).unwrap_or(false)
}

fn read_state(runtime_dir: &Path) -> QueueState {
    let path = runtime_dir.join(STATE_FILE_NAME);
    match std::fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "queue state file is corrupt, resetting");
            QueueState::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => QueueState::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read queue state, resetting");
            QueueState::default()
        }
    }
}

fn write_state_atomic(runtime_dir: &Path, state: &QueueState) -> Result<(), QueueError> {
    let path = runtime_dir.join(STATE_FILE_NAME);
    let tmp_path = runtime_dir.join(format!("{STATE_FILE_NAME}.{}.tmp", std::process::id()));
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| QueueError::Io(std::io::Error::other(e.to_string())))?;
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// Acquire the lock directory, hand the parsed state to `mutate`, write the
/// result back atomically, and release the lock — even if `mutate` returns
/// an error partway through (the state on disk is only updated on success).
pub async fn with_locked_state<C: Clock, F, R>(
    runtime_dir: &Path,
    clock: &C,
    mutate: F,
) -> Result<R, QueueError>
where
    F: FnOnce(&mut QueueState) -> R,
{
    let guard = acquire_lock_dir(runtime_dir, clock).await?;
    let mut state = read_state(runtime_dir);
    let result = mutate(&mut state);
    state.updated_at_epoch_ms = clock.epoch_ms();
    write_state_atomic(runtime_dir, &state)?;
    drop(guard);
    Ok(result)
}

/// `mkdir queue.lock` with mode `0700`; a bare `create_dir` on non-unix
/// targets, since there's no portable mode bits equivalent.
fn create_lock_dir(lock_path: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(lock_path)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
