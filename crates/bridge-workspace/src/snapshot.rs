// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace snapshot/diff: walk the per-client workspace
//! before and after adapter work to locate newly created or modified real
//! files, following directory symlinks but skipping file-level ones (those
//! point at upstream project files, not agent outputs).

use crate::error::WorkspaceError;
use bridge_core::{FileSnapshot, FileStat};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Default bound on the number of files a single walk will visit, protecting
/// against runaway symlink cycles or pathological project trees.
pub const DEFAULT_MAX_ENTRIES: usize = 50_000;

/// Cap on the number of changed files reported by [`diff`].
pub const MAX_DIFF_FILES: usize = 50;

/// Walk `root`, following directory symlinks but not file symlinks, and
/// collect `(abs_path -> FileStat)` for every real file found. Detects
/// symlink cycles via a visited-realpaths set and stops early past
/// `max_entries`.
pub fn walk(root: &Path, max_entries: usize) -> Result<FileSnapshot, WorkspaceError> {
    let mut entries = HashMap::new();
    let mut visited_dirs: HashSet<PathBuf> = HashSet::new();
    let mut stack = vec![root.to_path_buf()];

    if let Ok(real_root) = std::fs::canonicalize(root) {
        visited_dirs.insert(real_root);
    }

    while let Some(dir) = stack.pop() {
        if entries.len() >= max_entries {
            tracing::warn!(root = %root.display(), max_entries, "workspace walk hit its entry cap");
            break;
        }
        let read_dir = match std::fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else { continue };

            if meta.is_dir() {
                stack.push(path);
                continue;
            }

            if meta.file_type().is_symlink() {
                match std::fs::metadata(&path) {
                    Ok(target_meta) if target_meta.is_dir() => {
                        let Ok(real) = std::fs::canonicalize(&path) else { continue };
                        if visited_dirs.insert(real) {
                            stack.push(path);
                        }
                    }
                    _ => continue,
                }
                continue;
            }

            if !meta.is_file() {
                continue;
            }

            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as i128)
                .unwrap_or_default();
            entries.insert(path, FileStat { mtime_ns, size_bytes: meta.len() });
        }
    }

    Ok(FileSnapshot::new(entries))
}

/// Re-walk `root` and return absolute paths of files that are new or whose
/// `(mtime_ns, size_bytes)` changed since `before`, capped at
/// [`MAX_DIFF_FILES`].
pub fn diff(
    before: &FileSnapshot,
    root: &Path,
    max_entries: usize,
) -> Result<Vec<PathBuf>, WorkspaceError> {
    let after = walk(root, max_entries)?;
    let mut changed: Vec<PathBuf> = after
        .entries
        .iter()
        .filter(|(path, stat)| !before.matches(path, stat))
        .map(|(path, _)| path.clone())
        .collect();
    changed.sort();
    changed.truncate(MAX_DIFF_FILES);
    Ok(changed)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
