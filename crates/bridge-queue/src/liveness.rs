// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness checks for stale-lease/entry reclaim: a pid is
//! "non-live" if sending it signal 0 fails with "no such process".

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Whether `pid` refers to a running process on this host. Signal 0 sends
/// no actual signal; a successful call or `EPERM` (process exists, owned by
/// someone else) both mean the pid is live. Only `ESRCH` means it's gone.
pub fn is_pid_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
