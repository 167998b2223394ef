// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The "collect files" control message: a platform-issued
//! synthetic request that bypasses the child process entirely and instead
//! walks the workspace, uploads every real file it finds, and reports back
//! the resulting URLs as a single synthetic chunk.

use crate::event::AdapterEvent;
use bridge_upload::UploadClient;
use std::path::{Path, PathBuf};

const MARKER: &str = "Collect files task (platform-issued):";
const MAX_FILES: usize = 1500;
const MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

/// Detect the collect-files directive in a message's content and extract its
/// upload credentials, if present.
pub fn detect(content: &str) -> Option<(String, String)> {
    if !content.contains(MARKER) {
        return None;
    }
    let url = extract_token(content, "UPLOAD_URL=")?;
    let token = extract_token(content, "UPLOAD_TOKEN=")?;
    Some((url, token))
}

fn extract_token(content: &str, prefix: &str) -> Option<String> {
    let start = content.find(prefix)? + prefix.len();
    let rest = &content[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    if rest[..end].is_empty() {
        None
    } else {
        Some(rest[..end].to_string())
    }
}

/// Enumerate real files under `workspace`, upload each, and produce the
/// synthetic chunk + done pair the platform expects.
pub async fn run(
    workspace: &Path,
    upload_url: &str,
    upload_token: &str,
    upload_client: &UploadClient,
) -> Vec<AdapterEvent> {
    let files = match enumerate_real_files(workspace) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(error = %e, "collect-files: workspace walk failed");
            return vec![
                AdapterEvent::text("COLLECT_FILES_FAILED"),
                AdapterEvent::Done { result: Some("COLLECT_FILES_FAILED".into()), attachments: Vec::new() },
            ];
        }
    };

    if files.is_empty() {
        return vec![
            AdapterEvent::text("NO_FILES_FOUND"),
            AdapterEvent::Done { result: Some("NO_FILES_FOUND".into()), attachments: Vec::new() },
        ];
    }

    let mut urls = Vec::with_capacity(files.len());
    for (relative, absolute) in files {
        if let Some(attachment) =
            upload_client.upload_or_log(upload_url, upload_token, &relative, &absolute).await
        {
            urls.push(attachment.url);
        }
    }

    let summary = if urls.is_empty() { "NO_FILES_FOUND".to_string() } else { urls.join("\n") };
    vec![
        AdapterEvent::text(summary.clone()),
        AdapterEvent::Done { result: Some(summary), attachments: Vec::new() },
    ]
}

/// Walk `workspace` collecting real (non-symlink) files, capped at
/// `MAX_FILES` entries and `MAX_FILE_BYTES` per file. Returns
/// `(posix_relative_path, absolute_path)` pairs.
fn enumerate_real_files(workspace: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    let mut stack = vec![workspace.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if out.len() >= MAX_FILES {
            break;
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if out.len() >= MAX_FILES {
                break;
            }
            let metadata = entry.metadata()?;
            if metadata.len() > MAX_FILE_BYTES {
                continue;
            }
            let relative = path
                .strip_prefix(workspace)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            out.push((relative, path));
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "collect_files_tests.rs"]
mod tests;
