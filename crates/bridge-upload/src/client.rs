// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streams diffed workspace files to a platform-supplied one-shot upload
//! endpoint. Failures are logged and swallowed: a broken upload must never
//! fail the surrounding `done`.

use crate::mime::mime_for_filename;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bridge_core::Attachment;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Per-file cap; files larger than this are skipped with a warning.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file too large ({0} bytes)")]
    TooLarge(u64),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upload endpoint returned status {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("upload response did not contain a `url` field")]
    MissingUrl,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Clone)]
pub struct UploadClient {
    http: reqwest::Client,
}

impl Default for UploadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    /// Upload a single file, returning the `Attachment` the upload endpoint
    /// produced. Callers that want failures logged and swallowed instead
    /// of propagated should use [`UploadClient::upload_or_log`] instead.
    pub async fn upload(
        &self,
        upload_url: &str,
        upload_token: &str,
        relative_path: &str,
        absolute_path: &Path,
    ) -> Result<Attachment, UploadError> {
        let metadata = tokio::fs::metadata(absolute_path).await?;
        if metadata.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge(metadata.len()));
        }
        let bytes = tokio::fs::read(absolute_path).await?;
        let content_base64 = BASE64.encode(bytes);
        let body = serde_json::json!({
            "filename": relative_path,
            "content_base64": content_base64,
        });

        let response = self
            .http
            .post(upload_url)
            .timeout(UPLOAD_TIMEOUT)
            .header("X-Upload-Token", upload_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::BadStatus(response.status()));
        }
        let parsed: UploadResponse = response.json().await.map_err(|_| UploadError::MissingUrl)?;
        Ok(Attachment {
            name: relative_path.to_string(),
            url: parsed.url,
            content_type: mime_for_filename(relative_path).to_string(),
        })
    }

    /// Upload a file, logging and returning `None` on any failure instead of
    /// propagating it, so a broken upload never fails the surrounding `done`.
    pub async fn upload_or_log(
        &self,
        upload_url: &str,
        upload_token: &str,
        relative_path: &str,
        absolute_path: &Path,
    ) -> Option<Attachment> {
        match self.upload(upload_url, upload_token, relative_path, absolute_path).await {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                tracing::warn!(file = relative_path, error = %e, "file upload failed, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
