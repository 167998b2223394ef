// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bridge-protocol: wire frame shapes and codec for the bridge ⇄ platform
//! WebSocket protocol.

mod frame;

pub use frame::{decode, encode, ChunkKind, DownstreamFrame, ProtocolError, UpstreamFrame, PROTOCOL_VERSION};
