// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output guard: stateless regex-based
//! secret redaction applied to adapter output before it is forwarded
//! upstream as a `chunk` or `done.result`.

use regex::Regex;
use std::sync::LazyLock;

const REDACTED: &str = "[REDACTED]";

// Allow expect here as each regex is compile-time verified to be valid.
#[allow(clippy::expect_used)]
static AWS_ACCESS_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AKIA[0-9A-Z]{16}").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static GITHUB_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gh[pousr]_[A-Za-z0-9]{36}").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static SLACK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"xox[baprs]-[A-Za-z0-9-]{10,}").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static BEARER_AUTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-]{8,}").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static PRIVATE_KEY_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-----BEGIN [A-Z ]*PRIVATE KEY-----[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static URL_USERINFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9+.\-]*://)[^\s/@:]+:[^\s/@]+@")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static KEY_VALUE_SECRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(api[_-]?key|secret|password|token)\s*[:=]\s*['"]?[A-Za-z0-9_\-]{8,}['"]?"#)
        .expect("constant regex pattern is valid")
});

fn redact_simple(content: &str, re: &Regex) -> String {
    re.replace_all(content, REDACTED).into_owned()
}

/// Replace known secret shapes in `content` with `[REDACTED]`. Content with
/// no match passes through unchanged.
pub fn apply_output_guard(content: &str) -> String {
    let mut out = content.to_string();
    out = redact_simple(&out, &AWS_ACCESS_KEY);
    out = redact_simple(&out, &GITHUB_TOKEN);
    out = redact_simple(&out, &SLACK_TOKEN);
    out = redact_simple(&out, &BEARER_AUTH);
    out = redact_simple(&out, &PRIVATE_KEY_BLOCK);
    out = URL_USERINFO.replace_all(&out, "${1}[REDACTED]@").into_owned();
    out = redact_simple(&out, &KEY_VALUE_SECRET);
    out
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
