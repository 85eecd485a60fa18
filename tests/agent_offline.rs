//! Agent cycles through the public API against the in-memory mailbox.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailpilot::agent::{AgentConfig, MailAgent, StopReason};
use mailpilot::approval::Decision;
use mailpilot::mailbox::{InMemoryMailbox, MailboxCall};
use mailpilot::{MailAgentError, ModelClient, builtin_registry};

/// Replays canned replies in order; answers "Done." once exhausted.
struct CannedModel {
    replies: Mutex<Vec<String>>,
}

impl CannedModel {
    fn new(replies: &[&str]) -> Self {
        let mut replies: Vec<String> = replies.iter().map(|r| (*r).to_owned()).collect();
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
        }
    }
}

#[async_trait]
impl ModelClient for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, MailAgentError> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| "Done.".to_owned()))
    }
}

#[tokio::test]
async fn schedule_meeting_round_trip() {
    let mailbox = Arc::new(InMemoryMailbox::sample());
    let registry = builtin_registry(mailbox.clone(), 10).unwrap();
    let model = Arc::new(CannedModel::new(&[
        concat!(
            "I'll set that up.\n",
            "<action name=\"schedule_meeting\">\n",
            "subject: Invoice review\n",
            "start: 2026-03-05T14:00\n",
            "end: 2026-03-05T14:30\n",
            "attendees: jane@example.com, marcus@example.com\n",
            "</action>",
        ),
        "The invoice review is on the calendar for March 5th.",
    ]));
    let agent = MailAgent::new(AgentConfig::default(), model, Arc::new(registry));

    let reply = agent
        .handle_message("set up a 30 minute invoice review with Jane and Marcus on March 5 at 2pm")
        .await
        .unwrap();
    assert_eq!(reply.stop, StopReason::ApprovalRequired);
    let pending = reply.pending.unwrap();
    assert_eq!(pending.invocation.action, "create_event");
    assert!(pending.description.contains("Invoice review"));
    assert!(
        !mailbox
            .calls()
            .iter()
            .any(|c| matches!(c, MailboxCall::CreateEvent(_)))
    );

    let reply = agent
        .resolve_approval(&pending.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(reply.stop, StopReason::Complete);
    assert_eq!(
        reply.text,
        "The invoice review is on the calendar for March 5th."
    );

    let created: Vec<_> = mailbox
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            MailboxCall::CreateEvent(event) => Some(event),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].subject, "Invoice review");
    assert_eq!(
        created[0].attendees,
        vec!["jane@example.com".to_owned(), "marcus@example.com".to_owned()]
    );
}

#[tokio::test]
async fn unknown_approval_id_does_not_call_the_model() {
    let mailbox = Arc::new(InMemoryMailbox::sample());
    let registry = builtin_registry(mailbox, 10).unwrap();
    let agent = MailAgent::new(
        AgentConfig::default(),
        Arc::new(CannedModel::new(&[])),
        Arc::new(registry),
    );

    let reply = agent
        .resolve_approval("not-a-real-id", Decision::Approve)
        .await
        .unwrap();
    assert_eq!(reply.stop, StopReason::ApprovalNotFound);
    assert_eq!(reply.model_calls, 0);
    assert!(agent.inspect(|s| s.memory.is_empty()).unwrap());
}
