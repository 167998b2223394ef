// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bridge-adapter: the polymorphic driver over local assistant processes and
//! remote HTTP/SSE gateways, plus the pure event-stream parser shared by both.

mod child_process;
mod collect_files;
mod event;
mod http_sse;
mod stream_parser;
mod trait_def;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use child_process::{ChildProcessAdapter, InvocationFlags};
pub use event::AdapterEvent;
pub use http_sse::HttpSseAdapter;
pub use trait_def::{Adapter, AdapterError, SessionBackend, SessionHandle, UploadCredentials};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAdapter, SendCall};
