//! In-process [`MailboxClient`] implementation.
//!
//! Holds messages, events, folders, tasks, rules and contacts in memory and
//! records every call it receives. Used by the binary's offline mode and by
//! tests that need to assert exactly which side effects an agent run caused.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::types::{
    CalendarEvent, ContactEntry, EmailDetails, EmailSummary, MailFolder, MailRule, NewEvent,
    NewRule, NewTask, OutgoingEmail, TaskItem,
};
use super::{MailboxClient, MailboxError, MailboxResult};

/// A call received by [`InMemoryMailbox`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum MailboxCall {
    SearchMessages { query: String, max_results: usize },
    ListUnread { max_results: usize },
    GetMessage { id: String },
    SendMessage(OutgoingEmail),
    ReplyToMessage { id: String, body: String },
    ForwardMessage { id: String, to: Vec<String>, comment: Option<String> },
    DeleteMessage { id: String },
    MoveMessage { id: String, folder: String },
    FlagMessage { id: String, flagged: bool },
    MarkRead { id: String, read: bool },
    ListEvents { days_ahead: u32 },
    CreateEvent(NewEvent),
    DeleteEvent { id: String },
    ListFolders,
    CreateFolder { name: String, parent: Option<String> },
    RenameFolder { id: String, name: String },
    DeleteFolder { id: String },
    ListTasks,
    CreateTask(NewTask),
    CompleteTask { id: String },
    DeleteTask { id: String },
    ListRules,
    CreateRule(NewRule),
    DeleteRule { id: String },
    SearchContacts { query: String },
}

impl MailboxCall {
    /// Whether this call changes mailbox state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::SearchMessages { .. }
                | Self::ListUnread { .. }
                | Self::GetMessage { .. }
                | Self::ListEvents { .. }
                | Self::ListFolders
                | Self::ListTasks
                | Self::ListRules
                | Self::SearchContacts { .. }
        )
    }
}

#[derive(Default)]
struct MailboxState {
    messages: Vec<EmailDetails>,
    events: Vec<CalendarEvent>,
    folders: Vec<MailFolder>,
    tasks: Vec<TaskItem>,
    rules: Vec<MailRule>,
    contacts: Vec<ContactEntry>,
    sent: Vec<OutgoingEmail>,
    next_id: u64,
}

impl MailboxState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn message_mut(&mut self, id: &str) -> MailboxResult<&mut EmailDetails> {
        self.messages
            .iter_mut()
            .find(|m| m.summary.id == id)
            .ok_or_else(|| MailboxError::NotFound(format!("message {id}")))
    }

    fn folder_named(&self, folder: &str) -> Option<&MailFolder> {
        self.folders
            .iter()
            .find(|f| f.id == folder || f.name.eq_ignore_ascii_case(folder))
    }
}

/// In-memory mailbox with call recording and failure injection.
#[derive(Default)]
pub struct InMemoryMailbox {
    state: Mutex<MailboxState>,
    calls: Mutex<Vec<MailboxCall>>,
    failure: Mutex<Option<MailboxError>>,
}

impl InMemoryMailbox {
    /// Create an empty mailbox with the standard Inbox/Archive folders.
    pub fn new() -> Self {
        let mailbox = Self::default();
        if let Ok(mut state) = mailbox.state.lock() {
            state.folders = vec![
                MailFolder {
                    id: "inbox".to_owned(),
                    name: "Inbox".to_owned(),
                    parent_id: None,
                    unread_count: 0,
                    total_count: 0,
                },
                MailFolder {
                    id: "archive".to_owned(),
                    name: "Archive".to_owned(),
                    parent_id: None,
                    unread_count: 0,
                    total_count: 0,
                },
            ];
        }
        mailbox
    }

    /// Seed messages.
    pub fn with_messages(self, messages: Vec<EmailDetails>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.messages.extend(messages);
        }
        self
    }

    /// Seed calendar events.
    pub fn with_events(self, events: Vec<CalendarEvent>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.events.extend(events);
        }
        self
    }

    /// Seed address-book entries.
    pub fn with_contacts(self, contacts: Vec<ContactEntry>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.contacts.extend(contacts);
        }
        self
    }

    /// A small, realistic mailbox for offline demos.
    pub fn sample() -> Self {
        let now = Utc::now();
        let message = |id: &str, name: &str, addr: &str, subject: &str, body: &str, hours: i64| {
            EmailDetails {
                summary: EmailSummary {
                    id: id.to_owned(),
                    sender_name: name.to_owned(),
                    sender_address: addr.to_owned(),
                    subject: subject.to_owned(),
                    received_at: now - Duration::hours(hours),
                    preview: body.to_owned(),
                    is_read: hours > 24,
                    flagged: false,
                },
                to: vec!["me@example.com".to_owned()],
                cc: Vec::new(),
                body: body.to_owned(),
                folder: Some("Inbox".to_owned()),
            }
        };
        Self::new()
            .with_messages(vec![
                message(
                    "msg-1",
                    "Jane Cooper",
                    "jane@example.com",
                    "Invoice #2041 for March",
                    "Hi, attached is the invoice for March consulting. Payment due in 30 days.",
                    3,
                ),
                message(
                    "msg-2",
                    "Billing",
                    "billing@vendor.example",
                    "Your invoice is ready",
                    "Your monthly invoice of $129.00 is now available in the portal.",
                    30,
                ),
                message(
                    "msg-3",
                    "Marcus Lee",
                    "marcus@example.com",
                    "Lunch on Thursday?",
                    "Are you free for lunch on Thursday around noon?",
                    6,
                ),
            ])
            .with_events(vec![CalendarEvent {
                id: "evt-1".to_owned(),
                subject: "Quarterly planning".to_owned(),
                start: now + Duration::days(1),
                end: now + Duration::days(1) + Duration::hours(1),
                location: Some("Room 4".to_owned()),
                attendees: vec!["jane@example.com".to_owned()],
            }])
            .with_contacts(vec![
                ContactEntry {
                    display_name: "Jane Cooper".to_owned(),
                    email: "jane@example.com".to_owned(),
                },
                ContactEntry {
                    display_name: "Marcus Lee".to_owned(),
                    email: "marcus@example.com".to_owned(),
                },
            ])
    }

    /// Make every subsequent call fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<MailboxError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<MailboxCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls that changed mailbox state.
    pub fn mutations(&self) -> Vec<MailboxCall> {
        self.calls()
            .into_iter()
            .filter(MailboxCall::is_mutation)
            .collect()
    }

    /// Messages sent through [`MailboxClient::send_message`].
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.state.lock().map(|s| s.sent.clone()).unwrap_or_default()
    }

    /// Ids of all messages still present.
    pub fn message_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.messages.iter().map(|m| m.summary.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Record `call` and return the state guard, or the injected failure.
    fn begin(&self, call: MailboxCall) -> MailboxResult<MutexGuard<'_, MailboxState>> {
        self.calls
            .lock()
            .map_err(|_| MailboxError::Backend("call log lock poisoned".to_owned()))?
            .push(call);
        let failure = self
            .failure
            .lock()
            .map_err(|_| MailboxError::Backend("failure lock poisoned".to_owned()))?
            .clone();
        if let Some(err) = failure {
            return Err(err);
        }
        self.state
            .lock()
            .map_err(|_| MailboxError::Backend("mailbox lock poisoned".to_owned()))
    }
}

fn matches_query(message: &EmailDetails, terms: &[String]) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        message.summary.subject,
        message.summary.sender_name,
        message.summary.sender_address,
        message.body
    )
    .to_lowercase();
    terms.iter().all(|t| haystack.contains(t.as_str()))
}

fn newest_first(mut hits: Vec<EmailSummary>, max_results: usize) -> Vec<EmailSummary> {
    hits.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    hits.truncate(max_results);
    hits
}

#[async_trait]
impl MailboxClient for InMemoryMailbox {
    async fn search_messages(
        &self,
        query: &str,
        max_results: usize,
    ) -> MailboxResult<Vec<EmailSummary>> {
        let state = self.begin(MailboxCall::SearchMessages {
            query: query.to_owned(),
            max_results,
        })?;
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let hits = state
            .messages
            .iter()
            .filter(|m| matches_query(m, &terms))
            .map(|m| m.summary.clone())
            .collect();
        Ok(newest_first(hits, max_results))
    }

    async fn list_unread(&self, max_results: usize) -> MailboxResult<Vec<EmailSummary>> {
        let state = self.begin(MailboxCall::ListUnread { max_results })?;
        let hits = state
            .messages
            .iter()
            .filter(|m| !m.summary.is_read)
            .map(|m| m.summary.clone())
            .collect();
        Ok(newest_first(hits, max_results))
    }

    async fn get_message(&self, id: &str) -> MailboxResult<Option<EmailDetails>> {
        let state = self.begin(MailboxCall::GetMessage { id: id.to_owned() })?;
        Ok(state.messages.iter().find(|m| m.summary.id == id).cloned())
    }

    async fn send_message(&self, email: &OutgoingEmail) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::SendMessage(email.clone()))?;
        if email.to.is_empty() {
            return Err(MailboxError::InvalidInput(
                "at least one recipient is required".to_owned(),
            ));
        }
        state.sent.push(email.clone());
        Ok(())
    }

    async fn reply_to_message(&self, id: &str, body: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::ReplyToMessage {
            id: id.to_owned(),
            body: body.to_owned(),
        })?;
        let original = state.message_mut(id)?;
        let reply = OutgoingEmail {
            to: vec![original.summary.sender_address.clone()],
            subject: format!("Re: {}", original.summary.subject),
            body: body.to_owned(),
            cc: Vec::new(),
            bcc: Vec::new(),
        };
        state.sent.push(reply);
        Ok(())
    }

    async fn forward_message(
        &self,
        id: &str,
        to: &[String],
        comment: Option<&str>,
    ) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::ForwardMessage {
            id: id.to_owned(),
            to: to.to_vec(),
            comment: comment.map(str::to_owned),
        })?;
        let original = state.message_mut(id)?;
        let body = match comment {
            Some(c) => format!("{c}\n\n---------- Forwarded message ----------\n{}", original.body),
            None => format!("---------- Forwarded message ----------\n{}", original.body),
        };
        let forward = OutgoingEmail {
            to: to.to_vec(),
            subject: format!("Fwd: {}", original.summary.subject),
            body,
            cc: Vec::new(),
            bcc: Vec::new(),
        };
        state.sent.push(forward);
        Ok(())
    }

    async fn delete_message(&self, id: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::DeleteMessage { id: id.to_owned() })?;
        let before = state.messages.len();
        state.messages.retain(|m| m.summary.id != id);
        if state.messages.len() == before {
            return Err(MailboxError::NotFound(format!("message {id}")));
        }
        Ok(())
    }

    async fn move_message(&self, id: &str, folder: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::MoveMessage {
            id: id.to_owned(),
            folder: folder.to_owned(),
        })?;
        let folder_name = state
            .folder_named(folder)
            .map(|f| f.name.clone())
            .ok_or_else(|| MailboxError::NotFound(format!("folder {folder}")))?;
        state.message_mut(id)?.folder = Some(folder_name);
        Ok(())
    }

    async fn flag_message(&self, id: &str, flagged: bool) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::FlagMessage {
            id: id.to_owned(),
            flagged,
        })?;
        state.message_mut(id)?.summary.flagged = flagged;
        Ok(())
    }

    async fn mark_read(&self, id: &str, read: bool) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::MarkRead {
            id: id.to_owned(),
            read,
        })?;
        state.message_mut(id)?.summary.is_read = read;
        Ok(())
    }

    async fn list_events(&self, days_ahead: u32) -> MailboxResult<Vec<CalendarEvent>> {
        let state = self.begin(MailboxCall::ListEvents { days_ahead })?;
        let now = Utc::now();
        let horizon = now + Duration::days(i64::from(days_ahead));
        let mut events: Vec<CalendarEvent> = state
            .events
            .iter()
            .filter(|e| e.end >= now && e.start <= horizon)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(events)
    }

    async fn create_event(&self, event: &NewEvent) -> MailboxResult<CalendarEvent> {
        let mut state = self.begin(MailboxCall::CreateEvent(event.clone()))?;
        if event.end <= event.start {
            return Err(MailboxError::InvalidInput(
                "event end must be after its start".to_owned(),
            ));
        }
        let created = CalendarEvent {
            id: state.next_id("evt"),
            subject: event.subject.clone(),
            start: event.start,
            end: event.end,
            location: event.location.clone(),
            attendees: event.attendees.clone(),
        };
        state.events.push(created.clone());
        Ok(created)
    }

    async fn delete_event(&self, id: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::DeleteEvent { id: id.to_owned() })?;
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Err(MailboxError::NotFound(format!("event {id}")));
        }
        Ok(())
    }

    async fn list_folders(&self) -> MailboxResult<Vec<MailFolder>> {
        let state = self.begin(MailboxCall::ListFolders)?;
        let folders = state
            .folders
            .iter()
            .map(|f| {
                let in_folder = state
                    .messages
                    .iter()
                    .filter(|m| m.folder.as_deref() == Some(f.name.as_str()));
                let (total, unread) = in_folder.fold((0u32, 0u32), |(t, u), m| {
                    (t + 1, u + u32::from(!m.summary.is_read))
                });
                MailFolder {
                    total_count: total,
                    unread_count: unread,
                    ..f.clone()
                }
            })
            .collect();
        Ok(folders)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> MailboxResult<MailFolder> {
        let mut state = self.begin(MailboxCall::CreateFolder {
            name: name.to_owned(),
            parent: parent.map(str::to_owned),
        })?;
        if state.folder_named(name).is_some() {
            return Err(MailboxError::InvalidInput(format!(
                "a folder named {name} already exists"
            )));
        }
        let parent_id = match parent {
            Some(p) => Some(
                state
                    .folder_named(p)
                    .map(|f| f.id.clone())
                    .ok_or_else(|| MailboxError::NotFound(format!("folder {p}")))?,
            ),
            None => None,
        };
        let folder = MailFolder {
            id: state.next_id("folder"),
            name: name.to_owned(),
            parent_id,
            unread_count: 0,
            total_count: 0,
        };
        state.folders.push(folder.clone());
        Ok(folder)
    }

    async fn rename_folder(&self, id: &str, name: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::RenameFolder {
            id: id.to_owned(),
            name: name.to_owned(),
        })?;
        let folder = state
            .folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| MailboxError::NotFound(format!("folder {id}")))?;
        let old = std::mem::replace(&mut folder.name, name.to_owned());
        for message in &mut state.messages {
            if message.folder.as_deref() == Some(old.as_str()) {
                message.folder = Some(name.to_owned());
            }
        }
        Ok(())
    }

    async fn delete_folder(&self, id: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::DeleteFolder { id: id.to_owned() })?;
        let before = state.folders.len();
        state.folders.retain(|f| f.id != id);
        if state.folders.len() == before {
            return Err(MailboxError::NotFound(format!("folder {id}")));
        }
        Ok(())
    }

    async fn list_tasks(&self) -> MailboxResult<Vec<TaskItem>> {
        let state = self.begin(MailboxCall::ListTasks)?;
        Ok(state.tasks.clone())
    }

    async fn create_task(&self, task: &NewTask) -> MailboxResult<TaskItem> {
        let mut state = self.begin(MailboxCall::CreateTask(task.clone()))?;
        let created = TaskItem {
            id: state.next_id("task"),
            title: task.title.clone(),
            due: task.due,
            completed: false,
            body: task.body.clone(),
        };
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn complete_task(&self, id: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::CompleteTask { id: id.to_owned() })?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| MailboxError::NotFound(format!("task {id}")))?;
        task.completed = true;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::DeleteTask { id: id.to_owned() })?;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(MailboxError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    async fn list_rules(&self) -> MailboxResult<Vec<MailRule>> {
        let state = self.begin(MailboxCall::ListRules)?;
        Ok(state.rules.clone())
    }

    async fn create_rule(&self, rule: &NewRule) -> MailboxResult<MailRule> {
        let mut state = self.begin(MailboxCall::CreateRule(rule.clone()))?;
        let created = MailRule {
            id: state.next_id("rule"),
            name: rule.name.clone(),
            enabled: true,
            from_address: rule.from_address.clone(),
            subject_contains: rule.subject_contains.clone(),
            move_to_folder: rule.move_to_folder.clone(),
            mark_read: rule.mark_read,
        };
        state.rules.push(created.clone());
        Ok(created)
    }

    async fn delete_rule(&self, id: &str) -> MailboxResult<()> {
        let mut state = self.begin(MailboxCall::DeleteRule { id: id.to_owned() })?;
        let before = state.rules.len();
        state.rules.retain(|r| r.id != id);
        if state.rules.len() == before {
            return Err(MailboxError::NotFound(format!("rule {id}")));
        }
        Ok(())
    }

    async fn search_contacts(&self, query: &str) -> MailboxResult<Vec<ContactEntry>> {
        let state = self.begin(MailboxCall::SearchContacts {
            query: query.to_owned(),
        })?;
        let q = query.to_lowercase();
        Ok(state
            .contacts
            .iter()
            .filter(|c| {
                c.display_name.to_lowercase().contains(&q) || c.email.to_lowercase().contains(&q)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn search_matches_all_terms_newest_first() {
        let mailbox = InMemoryMailbox::sample();
        let hits = mailbox.search_messages("invoice", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "msg-1");
        assert_eq!(hits[1].id, "msg-2");

        let hits = mailbox.search_messages("invoice march", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn search_respects_max_results() {
        let mailbox = InMemoryMailbox::sample();
        let hits = mailbox.search_messages("", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn delete_unknown_message_is_not_found() {
        let mailbox = InMemoryMailbox::sample();
        let err = mailbox.delete_message("nope").await.unwrap_err();
        assert!(matches!(err, MailboxError::NotFound(_)));
    }

    #[tokio::test]
    async fn move_message_updates_folder() {
        let mailbox = InMemoryMailbox::sample();
        mailbox.move_message("msg-3", "archive").await.unwrap();
        let message = mailbox.get_message("msg-3").await.unwrap().unwrap();
        assert_eq!(message.folder.as_deref(), Some("Archive"));
    }

    #[tokio::test]
    async fn reply_goes_to_original_sender() {
        let mailbox = InMemoryMailbox::sample();
        mailbox.reply_to_message("msg-3", "Sure!").await.unwrap();
        let sent = mailbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["marcus@example.com".to_owned()]);
        assert_eq!(sent[0].subject, "Re: Lunch on Thursday?");
    }

    #[tokio::test]
    async fn injected_failure_applies_to_every_call_and_is_recorded() {
        let mailbox = InMemoryMailbox::sample();
        mailbox.set_failure(Some(MailboxError::Unauthenticated("expired".into())));
        let err = mailbox.list_unread(5).await.unwrap_err();
        assert!(matches!(err, MailboxError::Unauthenticated(_)));
        assert_eq!(mailbox.calls().len(), 1);

        mailbox.set_failure(None);
        assert!(mailbox.list_unread(5).await.is_ok());
    }

    #[tokio::test]
    async fn mutations_exclude_reads() {
        let mailbox = InMemoryMailbox::sample();
        mailbox.list_folders().await.unwrap();
        mailbox.flag_message("msg-1", true).await.unwrap();
        assert_eq!(
            mailbox.mutations(),
            vec![MailboxCall::FlagMessage {
                id: "msg-1".to_owned(),
                flagged: true
            }]
        );
    }

    #[tokio::test]
    async fn folder_counts_reflect_messages() {
        let mailbox = InMemoryMailbox::sample();
        let folders = mailbox.list_folders().await.unwrap();
        let inbox = folders.iter().find(|f| f.id == "inbox").unwrap();
        assert_eq!(inbox.total_count, 3);
        assert_eq!(inbox.unread_count, 2);
    }

    #[tokio::test]
    async fn create_event_rejects_inverted_range() {
        let mailbox = InMemoryMailbox::new();
        let now = Utc::now();
        let err = mailbox
            .create_event(&NewEvent {
                subject: "Backwards".to_owned(),
                start: now,
                end: now - Duration::hours(1),
                attendees: Vec::new(),
                location: None,
                body: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MailboxError::InvalidInput(_)));
    }
}
