//! To-do actions: list, create, complete, delete.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    ActionDescriptor, ActionExecutor, ActionOutput, ActionParams, ActionResult, ParamSpec,
    ParamType,
};
use super::validation::{optional_datetime, optional_str, required_str};
use crate::mailbox::{MailboxClient, NewTask};

pub struct ListTasks {
    mailbox: Arc<dyn MailboxClient>,
}

impl ListTasks {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for ListTasks {
    async fn execute(&self, _params: &ActionParams) -> ActionResult {
        let tasks = self.mailbox.list_tasks().await?;
        if tasks.is_empty() {
            return Ok(ActionOutput::text("No tasks."));
        }
        let open = tasks.iter().filter(|t| !t.completed).count();
        let mut lines = vec![format!("{} task(s), {open} open:", tasks.len())];
        lines.extend(tasks.iter().map(|t| format!("- {}", t.format_line())));
        Ok(ActionOutput::text(lines.join("\n")))
    }
}

pub struct CreateTask {
    mailbox: Arc<dyn MailboxClient>,
}

impl CreateTask {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for CreateTask {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let task = NewTask {
            title: required_str(params, "title")?.to_owned(),
            due: optional_datetime(params, "due"),
            body: optional_str(params, "body").map(str::to_owned),
        };
        let created = self.mailbox.create_task(&task).await?;
        Ok(ActionOutput::text(format!(
            "Created task {}",
            created.format_line()
        )))
    }
}

pub struct CompleteTask {
    mailbox: Arc<dyn MailboxClient>,
}

impl CompleteTask {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for CompleteTask {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        self.mailbox.complete_task(id).await?;
        Ok(ActionOutput::text(format!("Completed task {id}.")))
    }
}

pub struct DeleteTask {
    mailbox: Arc<dyn MailboxClient>,
}

impl DeleteTask {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for DeleteTask {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        self.mailbox.delete_task(id).await?;
        Ok(ActionOutput::text(format!("Deleted task {id}.")))
    }
}

/// Catalog entries for task actions.
pub fn descriptors(mailbox: &Arc<dyn MailboxClient>) -> Vec<ActionDescriptor> {
    let id = || ParamSpec::required("id", ParamType::String, "Task id");
    vec![
        ActionDescriptor::new(
            "list_tasks",
            "List to-do items.",
            Arc::new(ListTasks::new(Arc::clone(mailbox))),
        )
        .alias("tasks")
        .alias("list_todos"),
        ActionDescriptor::new(
            "create_task",
            "Add a to-do item.",
            Arc::new(CreateTask::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("title", ParamType::String, "What needs doing"))
        .param(ParamSpec::optional("due", ParamType::DateTime, "Due date"))
        .param(ParamSpec::optional("body", ParamType::String, "Notes"))
        .alias("add_task")
        .alias("create_todo"),
        ActionDescriptor::new(
            "complete_task",
            "Mark a to-do item as done.",
            Arc::new(CompleteTask::new(Arc::clone(mailbox))),
        )
        .param(id())
        .alias("finish_task"),
        ActionDescriptor::new(
            "delete_task",
            "Delete a to-do item.",
            Arc::new(DeleteTask::new(Arc::clone(mailbox))),
        )
        .param(id())
        .gated()
        .summary("delete task {id}"),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use serde_json::json;

    use super::*;
    use crate::mailbox::InMemoryMailbox;

    #[tokio::test]
    async fn create_complete_and_list() {
        let mailbox: Arc<dyn MailboxClient> = Arc::new(InMemoryMailbox::new());
        let params = json!({"title": "Pay invoice", "due": "2026-03-15"})
            .as_object()
            .cloned()
            .unwrap();
        let out = CreateTask::new(Arc::clone(&mailbox))
            .execute(&params)
            .await
            .unwrap();
        assert!(out.text.contains("Pay invoice (due 2026-03-15)"));

        let id_params = json!({"id": "task-1"}).as_object().cloned().unwrap();
        CompleteTask::new(Arc::clone(&mailbox))
            .execute(&id_params)
            .await
            .unwrap();

        let listing = ListTasks::new(mailbox)
            .execute(&ActionParams::new())
            .await
            .unwrap();
        assert!(listing.text.starts_with("1 task(s), 0 open:"));
        assert!(listing.text.contains("[x] [id: task-1]"));
    }
}
