//! Inbox rule actions: list, create, delete.
//!
//! Creating a rule only affects future mail and can be undone by deleting
//! it, so only deletion is gated.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    ActionDescriptor, ActionError, ActionExecutor, ActionOutput, ActionParams, ActionResult,
    ParamSpec, ParamType,
};
use super::validation::{optional_bool, optional_str, required_str};
use crate::mailbox::{MailboxClient, NewRule};

pub struct ListRules {
    mailbox: Arc<dyn MailboxClient>,
}

impl ListRules {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for ListRules {
    async fn execute(&self, _params: &ActionParams) -> ActionResult {
        let rules = self.mailbox.list_rules().await?;
        if rules.is_empty() {
            return Ok(ActionOutput::text("No inbox rules."));
        }
        let lines: Vec<String> = rules
            .iter()
            .map(|r| format!("- {}", r.format_line()))
            .collect();
        Ok(ActionOutput::text(format!(
            "{} rule(s):\n{}",
            rules.len(),
            lines.join("\n")
        )))
    }
}

pub struct CreateRule {
    mailbox: Arc<dyn MailboxClient>,
}

impl CreateRule {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for CreateRule {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let rule = NewRule {
            name: required_str(params, "name")?.to_owned(),
            from_address: optional_str(params, "from_address").map(str::to_owned),
            subject_contains: optional_str(params, "subject_contains").map(str::to_owned),
            move_to_folder: optional_str(params, "move_to_folder").map(str::to_owned),
            mark_read: optional_bool(params, "mark_read").unwrap_or(false),
        };
        if rule.from_address.is_none() && rule.subject_contains.is_none() {
            return Err(ActionError::InvalidParams(
                "a rule needs from_address or subject_contains".to_owned(),
            ));
        }
        if rule.move_to_folder.is_none() && !rule.mark_read {
            return Err(ActionError::InvalidParams(
                "a rule needs move_to_folder or mark_read".to_owned(),
            ));
        }
        let created = self.mailbox.create_rule(&rule).await?;
        Ok(ActionOutput::text(format!(
            "Created rule {}",
            created.format_line()
        )))
    }
}

pub struct DeleteRule {
    mailbox: Arc<dyn MailboxClient>,
}

impl DeleteRule {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for DeleteRule {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        self.mailbox.delete_rule(id).await?;
        Ok(ActionOutput::text(format!("Deleted rule {id}.")))
    }
}

/// Catalog entries for rule actions.
pub fn descriptors(mailbox: &Arc<dyn MailboxClient>) -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "list_rules",
            "List inbox rules.",
            Arc::new(ListRules::new(Arc::clone(mailbox))),
        )
        .alias("rules"),
        ActionDescriptor::new(
            "create_rule",
            "Create an inbox rule for future incoming mail.",
            Arc::new(CreateRule::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("name", ParamType::String, "Rule name"))
        .param(ParamSpec::optional("from_address", ParamType::String, "Match sender address"))
        .param(ParamSpec::optional("subject_contains", ParamType::String, "Match subject text"))
        .param(ParamSpec::optional("move_to_folder", ParamType::String, "Folder to move matches into"))
        .param(ParamSpec::optional("mark_read", ParamType::Boolean, "Mark matches as read"))
        .alias("add_rule"),
        ActionDescriptor::new(
            "delete_rule",
            "Delete an inbox rule.",
            Arc::new(DeleteRule::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("id", ParamType::String, "Rule id"))
        .gated()
        .alias("remove_rule")
        .summary("delete inbox rule {id}"),
    ]
}
