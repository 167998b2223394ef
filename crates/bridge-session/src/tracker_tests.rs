// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn a_fresh_entry_is_contained_and_active() {
    let mut tracker = RequestTracker::new();
    tracker.insert_active("s1", "r1", 1_000, DEFAULT_TTL_MS);
    assert!(tracker.contains("s1", "r1"));
    assert!(!tracker.contains("s1", "r2"));
}

#[test]
fn mark_updates_status_in_place_without_changing_expiry() {
    let mut tracker = RequestTracker::new();
    tracker.insert_active("s1", "r1", 1_000, DEFAULT_TTL_MS);
    tracker.mark("s1", "r1", RequestStatus::Done);
    assert!(tracker.contains("s1", "r1"));
}

#[test]
fn mark_on_an_unknown_pair_is_a_no_op() {
    let mut tracker = RequestTracker::new();
    tracker.mark("missing", "missing", RequestStatus::Error);
    assert!(!tracker.contains("missing", "missing"));
}

#[test]
fn prune_expired_drops_only_entries_past_their_deadline() {
    let mut tracker = RequestTracker::new();
    tracker.insert_active("s1", "fresh", 1_000, 10_000);
    tracker.insert_active("s1", "stale", 1_000, 1);

    tracker.prune_expired(5_000);

    assert!(tracker.contains("s1", "fresh"));
    assert!(!tracker.contains("s1", "stale"));
}
