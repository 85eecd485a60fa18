//! Mail actions backed by a [`MailboxClient`].
//!
//! - [`SearchEmails`] / [`GetUnread`] — list matching messages (read-only);
//!   both replace the session's last search results
//! - [`GetEmail`] — full message by id (read-only)
//! - [`MoveEmail`], [`FlagEmail`], [`MarkRead`] — reversible organisation
//! - [`SendEmail`], [`ReplyEmail`], [`ForwardEmail`], [`DeleteEmail`] —
//!   irreversible, approval-gated

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    ActionDescriptor, ActionError, ActionExecutor, ActionOutput, ActionParams, ActionResult,
    ParamSpec, ParamType,
};
use super::validation::{optional_bool, optional_str, optional_u64, required_str, string_list};
use crate::mailbox::{EmailSummary, MailboxClient, OutgoingEmail};
use crate::session::SearchResultSet;

/// Hard ceiling on `max_results` regardless of what the model asks for.
pub const MAX_RESULTS_CAP: usize = 50;

fn result_limit(params: &ActionParams, default: usize) -> usize {
    optional_u64(params, "max_results")
        .map(|n| usize::try_from(n).unwrap_or(MAX_RESULTS_CAP))
        .unwrap_or(default)
        .clamp(1, MAX_RESULTS_CAP)
}

fn format_summaries(heading: &str, items: &[EmailSummary]) -> String {
    if items.is_empty() {
        return format!("{heading}: no messages found.");
    }
    let mut lines = vec![format!("{heading}: {} message(s)", items.len())];
    lines.extend(items.iter().map(|m| format!("- {}", m.format_line())));
    lines.join("\n")
}

// ─── SearchEmails ─────────────────────────────────────────────────────────────

pub struct SearchEmails {
    mailbox: Arc<dyn MailboxClient>,
    default_limit: usize,
}

impl SearchEmails {
    pub fn new(mailbox: Arc<dyn MailboxClient>, default_limit: usize) -> Self {
        Self {
            mailbox,
            default_limit,
        }
    }
}

#[async_trait]
impl ActionExecutor for SearchEmails {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let query = required_str(params, "query")?;
        let limit = result_limit(params, self.default_limit);
        let items = self.mailbox.search_messages(query, limit).await?;
        let text = format_summaries(&format!("Search results for \"{query}\""), &items);
        Ok(ActionOutput::text(text).with_search(SearchResultSet::new(query, items)))
    }
}

// ─── GetUnread ────────────────────────────────────────────────────────────────

pub struct GetUnread {
    mailbox: Arc<dyn MailboxClient>,
    default_limit: usize,
}

impl GetUnread {
    pub fn new(mailbox: Arc<dyn MailboxClient>, default_limit: usize) -> Self {
        Self {
            mailbox,
            default_limit,
        }
    }
}

#[async_trait]
impl ActionExecutor for GetUnread {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let limit = result_limit(params, self.default_limit);
        let items = self.mailbox.list_unread(limit).await?;
        let text = format_summaries("Unread messages", &items);
        Ok(ActionOutput::text(text).with_search(SearchResultSet::new("unread", items)))
    }
}

// ─── GetEmail ─────────────────────────────────────────────────────────────────

pub struct GetEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl GetEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for GetEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        match self.mailbox.get_message(id).await? {
            Some(message) => Ok(ActionOutput::text(message.format_full())),
            None => Err(ActionError::NotFound(format!("no message with id {id}"))),
        }
    }
}

// ─── SendEmail ────────────────────────────────────────────────────────────────

pub struct SendEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl SendEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for SendEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let email = OutgoingEmail {
            to: string_list(params, "to"),
            subject: required_str(params, "subject")?.to_owned(),
            body: required_str(params, "body")?.to_owned(),
            cc: string_list(params, "cc"),
            bcc: string_list(params, "bcc"),
        };
        if email.to.is_empty() {
            return Err(ActionError::InvalidParams(
                "at least one recipient is required".to_owned(),
            ));
        }
        self.mailbox.send_message(&email).await?;
        Ok(ActionOutput::text(format!(
            "Email sent to {} with subject \"{}\".",
            email.to.join(", "),
            email.subject
        )))
    }
}

// ─── ReplyEmail ───────────────────────────────────────────────────────────────

pub struct ReplyEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl ReplyEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for ReplyEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        let body = required_str(params, "body")?;
        self.mailbox.reply_to_message(id, body).await?;
        Ok(ActionOutput::text(format!("Replied to message {id}.")))
    }
}

// ─── ForwardEmail ─────────────────────────────────────────────────────────────

pub struct ForwardEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl ForwardEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for ForwardEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        let to = string_list(params, "to");
        if to.is_empty() {
            return Err(ActionError::InvalidParams(
                "at least one recipient is required".to_owned(),
            ));
        }
        self.mailbox
            .forward_message(id, &to, optional_str(params, "comment"))
            .await?;
        Ok(ActionOutput::text(format!(
            "Forwarded message {id} to {}.",
            to.join(", ")
        )))
    }
}

// ─── DeleteEmail ──────────────────────────────────────────────────────────────

pub struct DeleteEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl DeleteEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for DeleteEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        self.mailbox.delete_message(id).await?;
        Ok(ActionOutput::text(format!("Deleted message {id}.")))
    }
}

// ─── MoveEmail ────────────────────────────────────────────────────────────────

pub struct MoveEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl MoveEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for MoveEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        let folder = required_str(params, "folder")?;
        self.mailbox.move_message(id, folder).await?;
        Ok(ActionOutput::text(format!("Moved message {id} to {folder}.")))
    }
}

// ─── FlagEmail ────────────────────────────────────────────────────────────────

pub struct FlagEmail {
    mailbox: Arc<dyn MailboxClient>,
}

impl FlagEmail {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for FlagEmail {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        let flagged = optional_bool(params, "flagged").unwrap_or(true);
        self.mailbox.flag_message(id, flagged).await?;
        let verb = if flagged { "Flagged" } else { "Unflagged" };
        Ok(ActionOutput::text(format!("{verb} message {id}.")))
    }
}

// ─── MarkRead ─────────────────────────────────────────────────────────────────

pub struct MarkRead {
    mailbox: Arc<dyn MailboxClient>,
}

impl MarkRead {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for MarkRead {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        let read = optional_bool(params, "read").unwrap_or(true);
        self.mailbox.mark_read(id, read).await?;
        let state = if read { "read" } else { "unread" };
        Ok(ActionOutput::text(format!("Marked message {id} as {state}.")))
    }
}

/// Catalog entries for mail actions.
pub fn descriptors(mailbox: &Arc<dyn MailboxClient>, default_limit: usize) -> Vec<ActionDescriptor> {
    let id = || ParamSpec::required("id", ParamType::String, "Message id from a previous listing");
    let max_results = || {
        ParamSpec::optional(
            "max_results",
            ParamType::Integer,
            format!("Maximum messages to return (default {default_limit}, max {MAX_RESULTS_CAP})"),
        )
    };
    vec![
        ActionDescriptor::new(
            "search_emails",
            "Search the mailbox by keywords, sender or subject.",
            Arc::new(SearchEmails::new(Arc::clone(mailbox), default_limit)),
        )
        .param(ParamSpec::required("query", ParamType::String, "Search terms"))
        .param(max_results())
        .alias("search")
        .alias("search_mail")
        .alias("find_emails"),
        ActionDescriptor::new(
            "get_unread",
            "List the most recent unread messages in the inbox.",
            Arc::new(GetUnread::new(Arc::clone(mailbox), default_limit)),
        )
        .param(max_results())
        .alias("unread")
        .alias("list_unread"),
        ActionDescriptor::new(
            "get_email",
            "Read one message in full.",
            Arc::new(GetEmail::new(Arc::clone(mailbox))),
        )
        .param(id())
        .alias("read_email")
        .alias("open_email"),
        ActionDescriptor::new(
            "send_email",
            "Send a new email.",
            Arc::new(SendEmail::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("to", ParamType::StringList, "Recipient addresses"))
        .param(ParamSpec::required("subject", ParamType::String, "Subject line"))
        .param(ParamSpec::required("body", ParamType::String, "Plain-text body"))
        .param(ParamSpec::optional("cc", ParamType::StringList, "CC addresses"))
        .param(ParamSpec::optional("bcc", ParamType::StringList, "BCC addresses"))
        .gated()
        .alias("send")
        .alias("compose_email")
        .summary("send email to {to} (subject \"{subject}\"): \"{body}\""),
        ActionDescriptor::new(
            "reply_email",
            "Reply to the sender of a message.",
            Arc::new(ReplyEmail::new(Arc::clone(mailbox))),
        )
        .param(id())
        .param(ParamSpec::required("body", ParamType::String, "Reply text"))
        .gated()
        .alias("reply")
        .summary("reply to message {id}: \"{body}\""),
        ActionDescriptor::new(
            "forward_email",
            "Forward a message to other recipients.",
            Arc::new(ForwardEmail::new(Arc::clone(mailbox))),
        )
        .param(id())
        .param(ParamSpec::required("to", ParamType::StringList, "Recipient addresses"))
        .param(ParamSpec::optional("comment", ParamType::String, "Text added above the forwarded message"))
        .gated()
        .alias("forward")
        .summary("forward message {id} to {to}"),
        ActionDescriptor::new(
            "delete_email",
            "Delete a message.",
            Arc::new(DeleteEmail::new(Arc::clone(mailbox))),
        )
        .param(id())
        .gated()
        .alias("delete")
        .alias("trash_email")
        .summary("delete message {id}"),
        ActionDescriptor::new(
            "move_email",
            "Move a message to another folder.",
            Arc::new(MoveEmail::new(Arc::clone(mailbox))),
        )
        .param(id())
        .param(ParamSpec::required("folder", ParamType::String, "Destination folder name or id"))
        .alias("move")
        .alias("archive_email"),
        ActionDescriptor::new(
            "flag_email",
            "Flag or unflag a message for follow-up.",
            Arc::new(FlagEmail::new(Arc::clone(mailbox))),
        )
        .param(id())
        .param(ParamSpec::optional("flagged", ParamType::Boolean, "false to clear the flag (default true)"))
        .alias("flag"),
        ActionDescriptor::new(
            "mark_read",
            "Mark a message as read or unread.",
            Arc::new(MarkRead::new(Arc::clone(mailbox))),
        )
        .param(id())
        .param(ParamSpec::optional("read", ParamType::Boolean, "false to mark unread (default true)"))
        .alias("mark_as_read"),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use serde_json::{Value, json};

    use super::*;
    use crate::mailbox::{InMemoryMailbox, MailboxCall, MailboxError};

    fn params(value: Value) -> ActionParams {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn search_returns_result_set() {
        let mailbox = Arc::new(InMemoryMailbox::sample());
        let exec = SearchEmails::new(mailbox.clone(), 10);
        let out = exec.execute(&params(json!({"query": "invoice"}))).await.unwrap();
        let set = out.search.unwrap();
        assert_eq!(set.query, "invoice");
        assert_eq!(set.items.len(), 2);
        assert!(out.text.contains("2 message(s)"));
        assert!(out.text.contains("[id: msg-1]"));
    }

    #[tokio::test]
    async fn search_clamps_max_results() {
        let mailbox = Arc::new(InMemoryMailbox::sample());
        let exec = SearchEmails::new(mailbox.clone(), 10);
        exec.execute(&params(json!({"query": "x", "max_results": 500})))
            .await
            .unwrap();
        assert_eq!(
            mailbox.calls(),
            vec![MailboxCall::SearchMessages {
                query: "x".into(),
                max_results: MAX_RESULTS_CAP
            }]
        );
    }

    #[tokio::test]
    async fn get_email_missing_is_not_found() {
        let exec = GetEmail::new(Arc::new(InMemoryMailbox::sample()));
        let err = exec.execute(&params(json!({"id": "nope"}))).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn send_passes_fields_through() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let exec = SendEmail::new(mailbox.clone());
        let out = exec
            .execute(&params(json!({"to": ["jane@x.com"], "subject": "Hi", "body": "Hello"})))
            .await
            .unwrap();
        assert!(out.text.contains("jane@x.com"));
        let sent = mailbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hi");
        assert_eq!(sent[0].body, "Hello");
    }

    #[tokio::test]
    async fn unauthenticated_mailbox_surfaces_reauth_kind() {
        let mailbox = Arc::new(InMemoryMailbox::sample());
        mailbox.set_failure(Some(MailboxError::Unauthenticated("token expired".into())));
        let exec = GetUnread::new(mailbox, 10);
        let err = exec.execute(&ActionParams::new()).await.unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
    }

    #[test]
    fn gated_set_matches_risk_class() {
        let mailbox: Arc<dyn MailboxClient> = Arc::new(InMemoryMailbox::new());
        let gated: Vec<String> = descriptors(&mailbox, 10)
            .into_iter()
            .filter(|d| d.requires_approval)
            .map(|d| d.name)
            .collect();
        assert_eq!(
            gated,
            vec!["send_email", "reply_email", "forward_email", "delete_email"]
        );
    }
}
