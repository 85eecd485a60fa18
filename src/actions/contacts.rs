//! Address-book lookup. Hits are merged into the session's known contacts.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    ActionDescriptor, ActionExecutor, ActionOutput, ActionParams, ActionResult, ParamSpec,
    ParamType,
};
use super::validation::required_str;
use crate::mailbox::MailboxClient;

pub struct SearchContacts {
    mailbox: Arc<dyn MailboxClient>,
}

impl SearchContacts {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for SearchContacts {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let query = required_str(params, "query")?;
        let contacts = self.mailbox.search_contacts(query).await?;
        if contacts.is_empty() {
            return Ok(ActionOutput::text(format!(
                "No contacts matching \"{query}\"."
            )));
        }
        let lines: Vec<String> = contacts
            .iter()
            .map(|c| format!("- {} <{}>", c.display_name, c.email))
            .collect();
        Ok(ActionOutput::text(format!(
            "Contacts matching \"{query}\":\n{}",
            lines.join("\n")
        ))
        .with_contacts(contacts))
    }
}

/// Catalog entries for contact actions.
pub fn descriptors(mailbox: &Arc<dyn MailboxClient>) -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "search_contacts",
            "Look up people in the address book by name or address.",
            Arc::new(SearchContacts::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("query", ParamType::String, "Name or address fragment"))
        .alias("find_contact")
        .alias("lookup_contact"),
    ]
}
