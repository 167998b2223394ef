// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn current_process_is_alive() {
    assert!(is_pid_alive(std::process::id()));
}

#[test]
fn an_unreasonably_large_pid_is_not_alive() {
    // PIDs on Linux are bounded well below this; pid_max defaults to far
    // less. A pid this high cannot correspond to a running process.
    assert!(!is_pid_alive(u32::MAX - 1));
}
