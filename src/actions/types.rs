//! Core action types: descriptors, invocations, executor outcomes.
//!
//! An [`ActionDescriptor`] is a static catalog entry binding a name, a
//! parameter specification and an approval flag to an [`ActionExecutor`].
//! The parser produces [`ToolInvocation`]s; executors turn them into an
//! [`ActionOutput`] or an [`ActionError`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mailbox::{ContactEntry, MailboxError};
use crate::session::SearchResultSet;

/// Default maximum tool output size kept in memory (16 KB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024;

/// Parameter map carried by an invocation.
pub type ActionParams = serde_json::Map<String, Value>;

/// A request to run one action, as extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Action name exactly as the model wrote it (before alias resolution).
    pub action: String,
    /// Parameters keyed by name.
    #[serde(default)]
    pub params: ActionParams,
}

impl ToolInvocation {
    pub fn new(action: impl Into<String>, params: ActionParams) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    /// `name(key=value, …)` rendering used in logs and fallback descriptions.
    pub fn render_call(&self) -> String {
        let args: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={}", render_value(v)))
            .collect();
        format!("{}({})", self.action, args.join(", "))
    }
}

/// Longest parameter value, in characters, shown in an approval description.
pub const SUMMARY_VALUE_MAX_CHARS: usize = 160;

fn summary_value(value: &str) -> String {
    let flat = value.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SUMMARY_VALUE_MAX_CHARS) {
        Some((end, _)) => format!("{}...", &flat[..end]),
        None => flat,
    }
}

/// Render a parameter value without JSON quoting for plain strings.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Declared type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    /// RFC 3339 or `YYYY-MM-DDTHH:MM` (interpreted as UTC).
    DateTime,
    /// Array of strings, or a comma-separated string.
    StringList,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::StringList => "string_list",
        };
        f.write_str(name)
    }
}

/// One entry of an action's parameter specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            description: description.into(),
        }
    }
}

/// Successful result of an executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    /// Text fed back to the model.
    pub text: String,
    /// Replaces the session's last search results when present.
    pub search: Option<SearchResultSet>,
    /// Contacts discovered by this action, merged into the session directory.
    pub contacts: Vec<ContactEntry>,
}

impl ActionOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: SearchResultSet) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_contacts(mut self, contacts: Vec<ContactEntry>) -> Self {
        self.contacts = contacts;
        self
    }
}

/// Structured failure of a single action.
///
/// Never escapes the agent loop: every variant is rendered into a
/// tool-result turn so the model can explain or recover.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The mailbox provider has no valid credentials.
    #[error("re-authentication needed: {0}")]
    Unauthenticated(String),
    /// The referenced item does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Parameters are missing or malformed.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// The provider failed.
    #[error("{0}")]
    Backend(String),
    /// The executor did not finish in time.
    #[error("timed out after {0}s")]
    Timeout(u64),
    /// No action is registered under this name.
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    /// The human declined the action.
    #[error("rejected by user{}", rejection_suffix(.0))]
    Rejected(Option<String>),
}

fn rejection_suffix(comment: &Option<String>) -> String {
    match comment.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => format!(": {c}"),
        _ => String::new(),
    }
}

impl ActionError {
    /// Stable kind tag shown in tool-result turns.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::NotFound(_) => "not_found",
            Self::InvalidParams(_) => "invalid_params",
            Self::Backend(_) => "backend",
            Self::Timeout(_) => "timeout",
            Self::UnknownAction(_) => "unknown_action",
            Self::Rejected(_) => "rejected",
        }
    }
}

impl From<MailboxError> for ActionError {
    fn from(e: MailboxError) -> Self {
        match e {
            MailboxError::Unauthenticated(m) => Self::Unauthenticated(m),
            MailboxError::NotFound(m) => Self::NotFound(m),
            MailboxError::InvalidInput(m) => Self::InvalidParams(m),
            MailboxError::RateLimited(m) => {
                Self::Backend(format!("mailbox rate limited, try again later: {m}"))
            }
            MailboxError::Backend(m) => Self::Backend(m),
        }
    }
}

/// Result of running one action.
pub type ActionResult = std::result::Result<ActionOutput, ActionError>;

/// Behaviour bound to a catalog entry.
///
/// Executors receive parameters that already passed validation and
/// coercion against the descriptor's [`ParamSpec`]s.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, params: &ActionParams) -> ActionResult;
}

/// Static catalog entry.
#[derive(Clone)]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub requires_approval: bool,
    pub aliases: Vec<String>,
    /// Approval description template; `{param}` placeholders are substituted.
    pub summary: Option<String>,
    pub executor: Arc<dyn ActionExecutor>,
}

impl ActionDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            requires_approval: false,
            aliases: Vec::new(),
            summary: None,
            executor,
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Mark this action as requiring human approval.
    pub fn gated(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn summary(mut self, template: impl Into<String>) -> Self {
        self.summary = Some(template.into());
        self
    }

    /// Human-readable description of `params` for an approval prompt.
    ///
    /// Uses the summary template when every placeholder it names is present,
    /// otherwise falls back to `name(key=value, …)`. Substituted values are
    /// flattened to one line and clipped to [`SUMMARY_VALUE_MAX_CHARS`].
    pub fn describe(&self, params: &ActionParams) -> String {
        let fallback = || ToolInvocation::new(self.name.clone(), params.clone()).render_call();
        let Some(ref template) = self.summary else {
            return fallback();
        };

        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                rest = "";
                break;
            };
            let key = &after[..close];
            match params.get(key).map(render_value) {
                Some(v) if !v.is_empty() => out.push_str(&summary_value(&v)),
                _ => return fallback(),
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("requires_approval", &self.requires_approval)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// Truncate a string to at most `max_bytes`, respecting UTF-8 boundaries.
///
/// Returns `(truncated_string, was_truncated)`.
pub fn truncate_output(s: &str, max_bytes: usize) -> (String, bool) {
    if s.len() <= max_bytes {
        return (s.to_string(), false);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    (
        format!("{}\n\n[output truncated at {max_bytes} bytes]", &s[..end]),
        true,
    )
}
