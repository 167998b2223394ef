// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared value types for the bridge runtime.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A request's lifecycle status as tracked by the request tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Active,
    Done,
    Error,
    Cancelled,
}

/// One recently-seen `{session_id, request_id}` pair, kept for dedup.
///
/// TTL default is 10 minutes. Expired entries are pruned
/// lazily by the session manager, never eagerly.
#[derive(Debug, Clone)]
pub struct RequestTrackerEntry {
    pub status: RequestStatus,
    pub expires_at_epoch_ms: u64,
    pub created_at_epoch_ms: u64,
}

/// A file's identity for snapshot/diff comparisons: `(mtime_ns, size_bytes)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mtime_ns: i128,
    pub size_bytes: u64,
}

/// Immutable map of absolute path to its stat, taken before adapter work
/// begins and compared against after completion.
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    pub entries: HashMap<PathBuf, FileStat>,
}

impl FileSnapshot {
    pub fn new(entries: HashMap<PathBuf, FileStat>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// True if `path` is present with exactly the same stat as `other`.
    pub fn matches(&self, path: &PathBuf, other: &FileStat) -> bool {
        self.entries.get(path).is_some_and(|stat| stat == other)
    }
}

/// A platform-visible file descriptor produced by the upload client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    pub content_type: String,
}

/// The `<scheme>:<user>:<agent>` prefix of a `skillshot:`-style session id,
/// used to detect logical-session replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalSessionPrefix(pub String);

/// Extract the logical session prefix from a session id of the form
/// `skillshot:<user>:<agent>:<uuid>` (first three colon-separated segments).
///
/// Session ids that don't match this shape have no logical prefix and are
/// never replaced implicitly.
pub fn logical_session_prefix(session_id: &str) -> Option<LogicalSessionPrefix> {
    let mut parts = session_id.splitn(4, ':');
    let scheme = parts.next()?;
    if scheme != "skillshot" {
        return None;
    }
    let user = parts.next()?;
    let agent = parts.next()?;
    parts.next()?; // uuid suffix must be present, even if unused here
    Some(LogicalSessionPrefix(format!("{scheme}:{user}:{agent}")))
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
