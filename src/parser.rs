//! Extraction of action directives from free-text model output.
//!
//! A directive is a tag pair carrying the action name, wrapping one
//! parameter payload:
//!
//! ```text
//! <action name="send_email">{"to": "jane@example.com", "subject": "Hi", "body": "Hello"}</action>
//! ```
//!
//! The payload is either a JSON object or `key: value` lines (`key=value`
//! also accepted). Keys are lower-case parameter names and a `:` must be
//! followed by whitespace, so any other line (`PS: ...`, a URL) continues
//! the previous value. An empty payload means "no parameters".
//!
//! Parsing is best-effort and never fails: a directive whose payload cannot
//! be read is logged, skipped, and left in the residual text untouched.
//!
//! # Examples
//!
//! ```
//! use mailpilot::parser::parse_response;
//!
//! let parsed = parse_response(
//!     "Let me look.\n<action name=\"search_emails\">query: invoices</action>",
//! );
//! assert_eq!(parsed.invocations.len(), 1);
//! assert_eq!(parsed.invocations[0].action, "search_emails");
//! assert_eq!(parsed.residual, "Let me look.");
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::actions::{ActionParams, ToolInvocation};

/// Directive syntax as explained to the model.
pub const DIRECTIVE_FORMAT: &str = r#"To perform an action, write a directive on its own line:
<action name="ACTION_NAME">{"param": "value", "other_param": "value"}</action>
- The payload is a single flat JSON object; list values may be JSON arrays.
- Use <action name="ACTION_NAME"></action> for actions without parameters.
- You may emit several directives in one reply; they run in order.
- Actions marked [REQUIRES APPROVAL] wait for the user to approve them. Do not repeat them while pending.
- When you need no more actions, reply with plain text and no directives."#;

/// Result of parsing one model reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedResponse {
    /// Well-formed directives, in textual order.
    pub invocations: Vec<ToolInvocation>,
    /// Input text with extracted directives removed.
    pub residual: String,
    /// Directives skipped because their payload was malformed.
    pub dropped: usize,
}

impl ParsedResponse {
    pub fn has_invocations(&self) -> bool {
        !self.invocations.is_empty()
    }
}

fn directive_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r#"(?is)<action\s+name\s*=\s*["']?([A-Za-z0-9_\-\. ]+?)["']?\s*>(.*?)</action\s*>"#,
            )
            .ok()
        })
        .as_ref()
}

/// Extract every well-formed directive from `text`.
///
/// Text without directives is returned unchanged as the residual.
pub fn parse_response(text: &str) -> ParsedResponse {
    let Some(pattern) = directive_pattern() else {
        return ParsedResponse {
            residual: text.to_owned(),
            ..ParsedResponse::default()
        };
    };

    let mut invocations = Vec::new();
    let mut dropped = 0;
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(name), Some(payload)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let name = name.as_str().trim();
        match parse_payload(payload.as_str()) {
            Some(params) => {
                segments.push(&text[cursor..whole.start()]);
                cursor = whole.end();
                invocations.push(ToolInvocation::new(name, params));
            }
            None => {
                dropped += 1;
                warn!(action = %name, "dropping directive with malformed payload");
            }
        }
    }

    if invocations.is_empty() {
        return ParsedResponse {
            invocations,
            residual: text.to_owned(),
            dropped,
        };
    }

    segments.push(&text[cursor..]);
    ParsedResponse {
        invocations,
        residual: join_segments(&segments),
        dropped,
    }
}

/// Parse a directive payload; `None` when it is malformed.
fn parse_payload(raw: &str) -> Option<ActionParams> {
    let payload = strip_code_fence(raw.trim());
    if payload.is_empty() {
        return Some(ActionParams::new());
    }
    if payload.starts_with('{') {
        return match serde_json::from_str::<Value>(payload).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        };
    }
    parse_key_values(payload)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(inner) = s.strip_prefix("```") else {
        return s;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return s;
    };
    // Drop an optional language tag on the opening fence.
    match inner.split_once('\n') {
        Some((tag, rest)) if !tag.contains(['{', ':', '=']) => rest.trim(),
        _ => inner.trim(),
    }
}

fn parse_key_values(payload: &str) -> Option<ActionParams> {
    let mut params = ActionParams::new();
    let mut current: Option<String> = None;

    for line in payload.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match split_key_value(trimmed) {
            Some((key, value)) => {
                params.insert(key.to_owned(), Value::String(unquote(value).to_owned()));
                current = Some(key.to_owned());
            }
            None => {
                let key = current.as_ref()?;
                if let Some(Value::String(existing)) = params.get_mut(key) {
                    existing.push('\n');
                    existing.push_str(trimmed);
                }
            }
        }
    }

    (!params.is_empty()).then_some(params)
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let idx = line.find([':', '='])?;
    let key = line[..idx].trim_end();
    let value = &line[idx + 1..];
    let valid_key = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    // `https://...` and `10:30` are values, not keys.
    let separated = line[idx..].starts_with('=')
        || value.is_empty()
        || value.starts_with(char::is_whitespace);
    (valid_key && separated).then(|| (key, value.trim()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Join the text around removed directives.
///
/// Only the whitespace at each cut is touched: it collapses to one blank
/// line when it spanned a line break, otherwise to a single space.
/// Indentation of the line after a cut is kept.
fn join_segments(segments: &[&str]) -> String {
    let last = segments.len().saturating_sub(1);
    let mut out = String::new();
    let mut gap_newline = false;

    for (i, segment) in segments.iter().enumerate() {
        let mut piece = *segment;
        if i > 0 {
            let rest = piece.trim_start();
            let lead = &piece[..piece.len() - rest.len()];
            piece = match lead.rfind('\n') {
                Some(nl) => {
                    gap_newline = true;
                    &piece[nl + 1..]
                }
                None => rest,
            };
        }
        let mut trail_newline = false;
        if i < last {
            let kept = piece.trim_end();
            trail_newline = piece[kept.len()..].contains('\n');
            piece = kept;
        }
        if piece.trim().is_empty() {
            gap_newline |= trail_newline;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if gap_newline { "\n\n" } else { " " });
        }
        out.push_str(piece);
        gap_newline = trail_newline;
    }
    out
}
