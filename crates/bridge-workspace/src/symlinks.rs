// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-client workspace construction: a relative-symlink
//! view of the project root, one directory per `client_id`, that survives
//! the project being moved or renamed.

use crate::error::WorkspaceError;
use std::path::{Path, PathBuf};

/// Top-level project entries that are always mirrored into a client
/// workspace, even though some of them are dotfiles that would otherwise be
/// denylisted.
const ALLOWLIST: &[&str] = &["CLAUDE.md", ".claude", ".agents", "src"];

/// Top-level project entries never mirrored: the client-workspace root
/// itself, VCS and package manager directories, build outputs, and local
/// secrets.
const DENYLIST: &[&str] = &[
    ".bridge-clients",
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    ".venv",
    "venv",
    "__pycache__",
];

fn is_eligible(name: &str) -> bool {
    if ALLOWLIST.contains(&name) {
        return true;
    }
    if name.starts_with('.') {
        return false;
    }
    if DENYLIST.contains(&name) {
        return false;
    }
    if name.ends_with(".log") || name.starts_with(".env") {
        return false;
    }
    true
}

/// Ensure `<project_root>/.bridge-clients/<client_id>/` exists and contains
/// a relative symlink to every eligible top-level entry of `project_root`
/// that isn't already present. Existing symlinks or real files at the
/// target path are left untouched, so agent-created outputs from a prior
/// request survive across calls.
pub fn ensure_client_workspace(
    project_root: &Path,
    client_id: &str,
) -> Result<PathBuf, WorkspaceError> {
    let client_dir = project_root.join(".bridge-clients").join(client_id);
    std::fs::create_dir_all(&client_dir)?;

    for entry in std::fs::read_dir(project_root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else { continue };
        if !is_eligible(name_str) {
            continue;
        }

        let link_path = client_dir.join(&name);
        if link_path.symlink_metadata().is_ok() {
            continue;
        }

        let relative_target = PathBuf::from("..").join("..").join(&name);
        if let Err(e) = create_relative_symlink(&relative_target, &link_path) {
            tracing::warn!(
                client_id,
                entry = name_str,
                error = %e,
                "failed to symlink project entry into client workspace"
            );
        }
    }

    Ok(client_dir)
}

#[cfg(unix)]
fn create_relative_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn create_relative_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "client workspace symlinks are only supported on unix",
    ))
}

#[cfg(test)]
#[path = "symlinks_tests.rs"]
mod tests;
