//! Mailbox provider contract consumed by action executors.
//!
//! The agent never talks to a mail server directly: every action executor
//! holds an `Arc<dyn MailboxClient>` and calls one of the capabilities below.
//!
//! Implementations:
//! - [`GraphMailbox`] talks to a Graph-style REST API with a bearer token
//!   acquired from a [`TokenProvider`] before every call.
//! - [`InMemoryMailbox`] keeps everything in process; it backs offline
//!   mode and the test suite.

pub mod graph;
pub mod memory;
pub mod types;

use async_trait::async_trait;

use crate::observability::RedactedString;

pub use graph::{DEFAULT_GRAPH_BASE_URL, GraphMailbox, StaticTokenProvider, TokenProvider};
pub use memory::{InMemoryMailbox, MailboxCall};
pub use types::{
    CalendarEvent, ContactEntry, EmailDetails, EmailSummary, MailFolder, MailRule, NewEvent,
    NewRule, NewTask, OutgoingEmail, TaskItem,
};

/// Error type for mailbox operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// No valid bearer token could be obtained, or the provider rejected it.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// The referenced message, event, folder, task or rule does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The provider rejected the request payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The provider throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Any other provider or transport failure.
    #[error("mailbox error: {0}")]
    Backend(String),
}

/// Convenience alias for mailbox results.
pub type MailboxResult<T> = std::result::Result<T, MailboxError>;

/// Capabilities of the user's mailbox, calendar, task list and address book.
///
/// Implementations are stateless per call; authentication is resolved on
/// every request.
#[async_trait]
pub trait MailboxClient: Send + Sync {
    /// Full-text search across the mailbox.
    async fn search_messages(
        &self,
        query: &str,
        max_results: usize,
    ) -> MailboxResult<Vec<EmailSummary>>;

    /// Most recent unread messages in the inbox.
    async fn list_unread(&self, max_results: usize) -> MailboxResult<Vec<EmailSummary>>;

    /// Full message by id; `Ok(None)` when it does not exist.
    async fn get_message(&self, id: &str) -> MailboxResult<Option<EmailDetails>>;

    async fn send_message(&self, email: &OutgoingEmail) -> MailboxResult<()>;

    async fn reply_to_message(&self, id: &str, body: &str) -> MailboxResult<()>;

    async fn forward_message(
        &self,
        id: &str,
        to: &[String],
        comment: Option<&str>,
    ) -> MailboxResult<()>;

    async fn delete_message(&self, id: &str) -> MailboxResult<()>;

    /// Move a message into the folder named (or identified by) `folder`.
    async fn move_message(&self, id: &str, folder: &str) -> MailboxResult<()>;

    async fn flag_message(&self, id: &str, flagged: bool) -> MailboxResult<()>;

    async fn mark_read(&self, id: &str, read: bool) -> MailboxResult<()>;

    /// Events starting between now and `days_ahead` days from now.
    async fn list_events(&self, days_ahead: u32) -> MailboxResult<Vec<CalendarEvent>>;

    async fn create_event(&self, event: &NewEvent) -> MailboxResult<CalendarEvent>;

    async fn delete_event(&self, id: &str) -> MailboxResult<()>;

    async fn list_folders(&self) -> MailboxResult<Vec<MailFolder>>;

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> MailboxResult<MailFolder>;

    async fn rename_folder(&self, id: &str, name: &str) -> MailboxResult<()>;

    async fn delete_folder(&self, id: &str) -> MailboxResult<()>;

    async fn list_tasks(&self) -> MailboxResult<Vec<TaskItem>>;

    async fn create_task(&self, task: &NewTask) -> MailboxResult<TaskItem>;

    async fn complete_task(&self, id: &str) -> MailboxResult<()>;

    async fn delete_task(&self, id: &str) -> MailboxResult<()>;

    async fn list_rules(&self) -> MailboxResult<Vec<MailRule>>;

    async fn create_rule(&self, rule: &NewRule) -> MailboxResult<MailRule>;

    async fn delete_rule(&self, id: &str) -> MailboxResult<()>;

    /// Address-book lookup by name or address fragment.
    async fn search_contacts(&self, query: &str) -> MailboxResult<Vec<ContactEntry>>;
}

/// Parse a bearer token out of an environment variable, if set and non-empty.
pub fn token_from_env(var: &str) -> Option<RedactedString> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .map(RedactedString::new)
}
