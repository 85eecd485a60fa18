//! Action registry and built-in mailbox actions.
//!
//! # Overview
//!
//! - [`ActionDescriptor`] — name, parameter spec, approval flag, executor
//! - [`ActionRegistry`] — lookup by name or alias, catalog rendering
//! - [`validate_params`] — required/type checks with coercion before dispatch
//! - [`builtin_registry`] — the full catalog bound to a [`MailboxClient`](crate::mailbox::MailboxClient)
//!
//! Anything that sends, replies, forwards, deletes or creates a calendar
//! event requires approval; reads, listings and reversible organisation do not.

pub mod builtin;
pub mod calendar;
pub mod contacts;
pub mod folders;
pub mod mail;
pub mod registry;
pub mod rules;
pub mod tasks;
pub mod types;
pub mod validation;

pub use builtin::builtin_registry;
pub use registry::{ActionRegistry, RegistryError, normalize_name};
pub use types::{
    ActionDescriptor, ActionError, ActionExecutor, ActionOutput, ActionParams, ActionResult,
    DEFAULT_MAX_OUTPUT_BYTES, ParamSpec, ParamType, SUMMARY_VALUE_MAX_CHARS, ToolInvocation,
    render_value, truncate_output,
};
pub use validation::validate_params;
