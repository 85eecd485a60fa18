//! Secret redaction for API keys and mailbox bearer tokens.
//!
//! ```rust
//! use mailpilot::observability::redact::RedactedString;
//!
//! let token = RedactedString::new("eyJ0eXAiOiJKV1Qi");
//! assert_eq!(format!("{token}"), "[REDACTED]");
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A string wrapper that redacts its value in Display and Debug output.
///
/// The only way to read the wrapped value is [`as_str`](RedactedString::as_str).
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedString {
    inner: String,
}

impl RedactedString {
    /// Wrap a secret value.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Access the inner value. Only call this where the secret is sent on
    /// the wire (e.g. building an `Authorization` header).
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether the wrapped secret is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Display for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedString(\"[REDACTED]\")")
    }
}

fn secret_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]+", "${1}***REDACTED***"),
            (r"sk-[A-Za-z0-9_-]+", "sk-***REDACTED***"),
            (
                r#"(?i)("(?:api_key|access_token|refresh_token)"\s*:\s*)"[^"]*""#,
                "${1}\"***REDACTED***\"",
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Scrub bearer tokens, `sk-` API keys and JSON token fields from `s`.
///
/// Applied to provider and mailbox error bodies before they are logged or
/// fed back into a prompt.
pub fn redact_secrets(s: &str) -> String {
    let mut out = s.to_owned();
    for (re, replacement) in secret_patterns() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}
