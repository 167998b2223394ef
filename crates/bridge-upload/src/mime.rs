// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension → MIME type lookup for uploaded files.

const TABLE: &[(&str, &str)] = &[
    ("md", "text/markdown"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("ts", "text/typescript"),
    ("rs", "text/x-rust"),
    ("py", "text/x-python"),
    ("csv", "text/csv"),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("toml", "application/toml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
];

const DEFAULT_MIME: &str = "application/octet-stream";

/// Look up the MIME type for a file name by its extension, defaulting to
/// `application/octet-stream` for unknown or missing extensions.
pub fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext {
        Some(ext) => TABLE
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| *mime)
            .unwrap_or(DEFAULT_MIME),
        None => DEFAULT_MIME,
    }
}

#[cfg(test)]
#[path = "mime_tests.rs"]
mod tests;
