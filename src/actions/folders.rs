//! Folder actions: list, create, rename, delete.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    ActionDescriptor, ActionExecutor, ActionOutput, ActionParams, ActionResult, ParamSpec,
    ParamType,
};
use super::validation::{optional_str, required_str};
use crate::mailbox::MailboxClient;

pub struct ListFolders {
    mailbox: Arc<dyn MailboxClient>,
}

impl ListFolders {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for ListFolders {
    async fn execute(&self, _params: &ActionParams) -> ActionResult {
        let folders = self.mailbox.list_folders().await?;
        if folders.is_empty() {
            return Ok(ActionOutput::text("No folders."));
        }
        let lines: Vec<String> = folders
            .iter()
            .map(|f| format!("- {}", f.format_line()))
            .collect();
        Ok(ActionOutput::text(format!(
            "{} folder(s):\n{}",
            folders.len(),
            lines.join("\n")
        )))
    }
}

pub struct CreateFolder {
    mailbox: Arc<dyn MailboxClient>,
}

impl CreateFolder {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for CreateFolder {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let name = required_str(params, "name")?;
        let folder = self
            .mailbox
            .create_folder(name, optional_str(params, "parent"))
            .await?;
        Ok(ActionOutput::text(format!(
            "Created folder {} [id: {}].",
            folder.name, folder.id
        )))
    }
}

pub struct RenameFolder {
    mailbox: Arc<dyn MailboxClient>,
}

impl RenameFolder {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for RenameFolder {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        let name = required_str(params, "name")?;
        self.mailbox.rename_folder(id, name).await?;
        Ok(ActionOutput::text(format!("Renamed folder {id} to {name}.")))
    }
}

pub struct DeleteFolder {
    mailbox: Arc<dyn MailboxClient>,
}

impl DeleteFolder {
    pub fn new(mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl ActionExecutor for DeleteFolder {
    async fn execute(&self, params: &ActionParams) -> ActionResult {
        let id = required_str(params, "id")?;
        self.mailbox.delete_folder(id).await?;
        Ok(ActionOutput::text(format!("Deleted folder {id}.")))
    }
}

/// Catalog entries for folder actions.
pub fn descriptors(mailbox: &Arc<dyn MailboxClient>) -> Vec<ActionDescriptor> {
    let id = || ParamSpec::required("id", ParamType::String, "Folder id");
    vec![
        ActionDescriptor::new(
            "list_folders",
            "List mail folders with unread and total counts.",
            Arc::new(ListFolders::new(Arc::clone(mailbox))),
        )
        .alias("folders"),
        ActionDescriptor::new(
            "create_folder",
            "Create a mail folder.",
            Arc::new(CreateFolder::new(Arc::clone(mailbox))),
        )
        .param(ParamSpec::required("name", ParamType::String, "Folder name"))
        .param(ParamSpec::optional("parent", ParamType::String, "Parent folder name or id"))
        .alias("new_folder"),
        ActionDescriptor::new(
            "rename_folder",
            "Rename a mail folder.",
            Arc::new(RenameFolder::new(Arc::clone(mailbox))),
        )
        .param(id())
        .param(ParamSpec::required("name", ParamType::String, "New name")),
        ActionDescriptor::new(
            "delete_folder",
            "Delete a mail folder and everything in it.",
            Arc::new(DeleteFolder::new(Arc::clone(mailbox))),
        )
        .param(id())
        .gated()
        .alias("remove_folder")
        .summary("delete folder {id} and all messages in it"),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use serde_json::json;

    use super::*;
    use crate::mailbox::InMemoryMailbox;

    #[tokio::test]
    async fn create_then_list_shows_new_folder() {
        let mailbox: Arc<dyn MailboxClient> = Arc::new(InMemoryMailbox::new());
        let params = json!({"name": "Receipts"}).as_object().cloned().unwrap();
        let out = CreateFolder::new(Arc::clone(&mailbox))
            .execute(&params)
            .await
            .unwrap();
        assert!(out.text.starts_with("Created folder Receipts"));

        let listing = ListFolders::new(mailbox)
            .execute(&ActionParams::new())
            .await
            .unwrap();
        assert!(listing.text.starts_with("3 folder(s):"));
        assert!(listing.text.contains("Receipts"));
    }
}
