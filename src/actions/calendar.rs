//! Calendar actions: list upcoming events, create and delete events.
//!
//! Creating or deleting an event notifies attendees, so both are gated.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    ActionDescriptor, ActionError, ActionExecutor, ActionOutput, ActionParams, ActionResult,
    ParamSpec, ParamType,
};
use super::validation::{optional_str, optional_u64, required_datetime, required_str, string_list};
use crate::mailbox::{MailboxClient, NewEvent};

/// Default look-ahead for `list_events`.
pub const DEFAULT_DAYS_AHEAD: u32 = 7;
/// Longest look-ahead accepted.
pub const MAX_DAYS_AHEAD: u32 = 90;

pub struct ListEvents {
    mailbox: Arc<dyn MailboxClient>,
}

impl ListEvents {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for ListEvents {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let days = optional_u64(params, "days_ahead")
            .map(|d| u32::try_from(d).unwrap_or(MAX_DAYS_AHEAD))
            .unwrap_or(DEFAULT_DAYS_AHEAD)
            .clamp(1, MAX_DAYS_AHEAD);
        let events = self.mailbox.list_events(days).await?;
        if events.is_empty() {
            return Ok(ActionOutput::text(format!(
                "No events in the next {days} day(s)."
            )));
        }
        let mut lines = vec![format!(
            "{} event(s) in the next {days} day(s):",
            events.len()
        )];
        lines.extend(events.iter().map(|e| format!("- {}", e.format_line())));
        Ok(ActionOutput::text(lines.join("\n")))
    }
}

pub struct CreateEvent {
    mailbox: Arc<dyn MailboxClient>,
}

impl CreateEvent {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for CreateEvent {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let event = NewEvent {
            subject: required_str(params, "subject")?.to_owned(),
            start: required_datetime(params, "start")?,
            end: required_datetime(params, "end")?,
            attendees: string_list(params, "attendees"),
            location: optional_str(params, "location").map(str::to_owned),
            body: optional_str(params, "body").map(str::to_owned),
        };
        if event.end <= event.start {
            return Err(ActionError::InvalidParams(
                "event end must be after its start".to_owned(),
            ));
        }
        let created = self.mailbox.create_event(&event).await?;
        Ok(ActionOutput::text(format!(
            "Created event {}",
            created.format_line()
        )))
    }
}

pub struct DeleteEvent {
    mailbox: Arc<dyn MailboxClient>,
}

impl DeleteEvent {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for DeleteEvent {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        self.mailbox.delete_event(id).await?;
        Ok(ActionOutput::text(format!("Deleted event {id}.")))
    }
}

/// Catalog entries for calendar actions.
pub fn descriptors(mailbox: &Arc<dyn MailboxClient>) -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "list_events",
            "List upcoming calendar events.",
            Arc::new(ListEvents::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::optional(
            "days_ahead",
            ParamType::Integer,
            format!("How many days to look ahead (default {DEFAULT_DAYS_AHEAD})"),
        ))
        .alias("calendar")
        .alias("list_calendar"),
        ActionDescriptor::new(
            "create_event",
            "Create a calendar event and invite attendees.",
            Arc::new(CreateEvent::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("subject", ParamType::String, "Event title"))
        .param(ParamSpec::required("start", ParamType::DateTime, "Start time, e.g. 2026-03-01T09:00"))
        .param(ParamSpec::required("end", ParamType::DateTime, "End time"))
        .param(ParamSpec::optional("attendees", ParamType::StringList, "Attendee addresses"))
        .param(ParamSpec::optional("location", ParamType::String, "Where"))
        .param(ParamSpec::optional("body", ParamType::String, "Description"))
        .gated()
        .alias("schedule_meeting")
        .alias("add_event")
        .summary("create event \"{subject}\" from {start} to {end}"),
        ActionDescriptor::new(
            "delete_event",
            "Delete a calendar event.",
            Arc::new(DeleteEvent::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("id", ParamType::String, "Event id"))
        .gated()
        .alias("cancel_event")
        .summary("delete event {id}"),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use serde_json::{Value, json};

    use super::*;
    use crate::mailbox::{InMemoryMailbox, MailboxCall};

    fn params(value: Value) -> ActionParams {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn list_events_defaults_to_a_week() {
        let mailbox = Arc::new(InMemoryMailbox::sample());
        let out = ListEvents::new(mailbox.clone())
            .execute(&ActionParams::new())
            .await
            .unwrap();
        assert!(out.text.contains("Quarterly planning"));
        assert_eq!(
            mailbox.calls(),
            vec![MailboxCall::ListEvents {
                days_ahead: DEFAULT_DAYS_AHEAD
            }]
        );
    }

    #[tokio::test]
    async fn create_event_rejects_inverted_range_before_calling_mailbox() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let err = CreateEvent::new(mailbox.clone())
            .execute(&params(json!({
                "subject": "Sync",
                "start": "2026-03-01T10:00:00Z",
                "end": "2026-03-01T09:00:00Z"
            })))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_params");
        assert!(mailbox.calls().is_empty());
    }

    #[tokio::test]
    async fn create_event_returns_created_line() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let out = CreateEvent::new(mailbox)
            .execute(&params(json!({
                "subject": "Sync",
                "start": "2026-03-01T09:00:00Z",
                "end": "2026-03-01T09:30:00Z",
                "attendees": ["a@x.com"]
            })))
            .await
            .unwrap();
        assert!(out.text.starts_with("Created event [id: evt-"));
        assert!(out.text.contains("(with a@x.com)"));
    }
}
