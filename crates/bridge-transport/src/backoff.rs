// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect backoff schedule: start at 1 s, double on each failed attempt
//! up to a 30 s ceiling, and reset to 1 s on success.

use std::time::Duration;

const INITIAL_DELAY_MS: u64 = 1_000;
const MAX_DELAY_MS: u64 = 30_000;

/// Tracks the current reconnect delay across consecutive failed attempts.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectBackoff {
    current_ms: u64,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self { current_ms: INITIAL_DELAY_MS }
    }
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay to wait before the next reconnect attempt, then doubles for the
    /// attempt after that (capped at 30 s).
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.current_ms);
        self.current_ms = (self.current_ms * 2).min(MAX_DELAY_MS);
        delay
    }

    /// Reset to the initial delay after a successful connection.
    pub fn reset(&mut self) {
        self.current_ms = INITIAL_DELAY_MS;
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
