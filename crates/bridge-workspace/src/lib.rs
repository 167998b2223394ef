// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bridge-workspace: per-client symlinked workspaces and the snapshot/diff
//! mechanism used to locate newly created or modified adapter output files.

mod error;
mod snapshot;
mod symlinks;

pub use error::WorkspaceError;
pub use snapshot::{diff, walk, DEFAULT_MAX_ENTRIES, MAX_DIFF_FILES};
pub use symlinks::ensure_client_workspace;
