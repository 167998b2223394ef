// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A pooled adapter session and the mutable cell its forwarder task shares
//! with `message()` to learn which request is current without re-wiring
//! callbacks on every call.

use bridge_adapter::SessionHandle;
use bridge_core::FileSnapshot;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// The request a session's forwarder task should attribute in-flight
/// adapter events to, plus the context it needs to finish that request
/// (upload credentials, the pre-send workspace snapshot).
#[derive(Debug, Clone, Default)]
pub struct CurrentRequest {
    pub request_id: String,
    pub upload_url: Option<String>,
    pub upload_token: Option<String>,
    pub snapshot: FileSnapshot,
}

pub struct PooledSession {
    pub handle: Arc<SessionHandle>,
    pub workspace: PathBuf,
    pub last_seen_epoch_ms: u64,
    pub current: Arc<Mutex<CurrentRequest>>,
}
