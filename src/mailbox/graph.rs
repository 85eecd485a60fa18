//! [`MailboxClient`] backed by a Graph-style REST API.
//!
//! A bearer token is requested from the configured [`TokenProvider`] before
//! every call, so token refresh is entirely the provider's concern.
//!
//! HTTP status mapping:
//! - 401 / 403 → [`MailboxError::Unauthenticated`]
//! - 404 → [`MailboxError::NotFound`]
//! - 400 / 422 → [`MailboxError::InvalidInput`]
//! - 429 → [`MailboxError::RateLimited`]
//! - anything else → [`MailboxError::Backend`]

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::types::{
    CalendarEvent, ContactEntry, EmailDetails, EmailSummary, MailFolder, MailRule, NewEvent,
    NewRule, NewTask, OutgoingEmail, TaskItem,
};
use super::{MailboxClient, MailboxError, MailboxResult, token_from_env};
use crate::observability::{RedactedString, redact_secrets};

/// Default API root.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

const MESSAGE_FIELDS: &str = "id,subject,from,receivedDateTime,bodyPreview,isRead,flag";

/// Source of bearer tokens for the mailbox API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid token, or [`MailboxError::Unauthenticated`].
    async fn bearer_token(&self) -> MailboxResult<RedactedString>;
}

/// Token provider that hands out a fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<RedactedString>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<RedactedString>) -> Self {
        Self { token }
    }

    /// Read the token from `var`; an unset or blank variable yields a provider
    /// that always reports [`MailboxError::Unauthenticated`].
    pub fn from_env(var: &str) -> Self {
        Self::new(token_from_env(var))
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> MailboxResult<RedactedString> {
        match self.token {
            Some(ref token) if !token.is_empty() => Ok(token.clone()),
            _ => Err(MailboxError::Unauthenticated(
                "no mailbox access token is configured".to_owned(),
            )),
        }
    }
}

/// REST mailbox client.
pub struct GraphMailbox {
    base_url: String,
    client: reqwest::Client,
    tokens: Box<dyn TokenProvider>,
    task_list: Option<String>,
}

impl GraphMailbox {
    /// Create a client rooted at `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>, tokens: Box<dyn TokenProvider>) -> Self {
        Self::with_client(base_url, tokens, reqwest::Client::new())
    }

    /// Create a client with a caller-supplied `reqwest::Client` (timeouts, proxies).
    pub fn with_client(
        base_url: impl Into<String>,
        tokens: Box<dyn TokenProvider>,
        client: reqwest::Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            client,
            tokens,
            task_list: None,
        }
    }

    /// Use the task list with this display name or id instead of the default list.
    pub fn with_task_list(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.task_list = (!name.trim().is_empty()).then(|| name.trim().to_owned());
        self
    }

    /// The configured API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> MailboxResult<Option<Value>> {
        let token = self.tokens.bearer_token().await?;
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "mailbox request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", token.as_str()))
            .header("Prefer", "outlook.timezone=\"UTC\"");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailboxError::Backend(format!("request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MailboxError::Backend(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| MailboxError::Backend(format!("invalid response body: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> MailboxResult<T> {
        let value = self
            .call(Method::GET, path, query, None)
            .await?
            .ok_or_else(|| MailboxError::Backend(format!("empty response from {path}")))?;
        serde_json::from_value(value)
            .map_err(|e| MailboxError::Backend(format!("unexpected response shape: {e}")))
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> MailboxResult<T> {
        let value = self
            .call(Method::POST, path, &[], Some(body))
            .await?
            .ok_or_else(|| MailboxError::Backend(format!("empty response from {path}")))?;
        serde_json::from_value(value)
            .map_err(|e| MailboxError::Backend(format!("unexpected response shape: {e}")))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> MailboxResult<()> {
        self.call(method, path, &[], body).await.map(|_| ())
    }

    /// Resolve a folder display name to its id; unknown names pass through
    /// unchanged so well-known ids like `inbox` keep working.
    async fn folder_id(&self, folder: &str) -> MailboxResult<String> {
        let folders = self.list_folders().await?;
        Ok(folders
            .into_iter()
            .find(|f| f.id == folder || f.name.eq_ignore_ascii_case(folder))
            .map(|f| f.id)
            .unwrap_or_else(|| folder.to_owned()))
    }

    async fn default_task_list(&self) -> MailboxResult<String> {
        let lists: Page<WireTaskList> = self.get("/me/todo/lists", &[]).await?;
        if let Some(ref wanted) = self.task_list {
            return lists
                .value
                .into_iter()
                .find(|l| l.id == *wanted || l.display_name.eq_ignore_ascii_case(wanted))
                .map(|l| l.id)
                .ok_or_else(|| MailboxError::NotFound(format!("task list '{wanted}'")));
        }
        let fallback = lists.value.first().map(|l| l.id.clone());
        lists
            .value
            .into_iter()
            .find(|l| l.wellknown_list_name.as_deref() == Some("defaultList"))
            .map(|l| l.id)
            .or(fallback)
            .ok_or_else(|| MailboxError::NotFound("no task list available".to_owned()))
    }

    async fn message_page(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> MailboxResult<Vec<EmailSummary>> {
        let page: Page<WireMessage> = self.get(path, query).await?;
        Ok(page.value.into_iter().map(WireMessage::into_summary).collect())
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn recipients(addresses: &[String]) -> Value {
    Value::Array(
        addresses
            .iter()
            .map(|a| json!({ "emailAddress": { "address": a } }))
            .collect(),
    )
}

fn graph_time(at: DateTime<Utc>) -> Value {
    json!({
        "dateTime": at.to_rfc3339_opts(SecondsFormat::Secs, true).trim_end_matches('Z'),
        "timeZone": "UTC",
    })
}

/// Map a non-success status to a [`MailboxError`], redacting the body.
pub(crate) fn map_http_error(status: reqwest::StatusCode, body: &str) -> MailboxError {
    let message = redact_secrets(&extract_error_message(body));
    match status.as_u16() {
        401 | 403 => MailboxError::Unauthenticated(format!(
            "mailbox rejected credentials (HTTP {}): {message}",
            status.as_u16()
        )),
        404 => MailboxError::NotFound(message),
        400 | 422 => MailboxError::InvalidInput(message),
        429 => MailboxError::RateLimited(message),
        code => MailboxError::Backend(format!("HTTP {code}: {message}")),
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

// ── Wire types ────────────────────────────────────────────────

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Deserialize, Default)]
struct WireAddress {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecipient {
    #[serde(default)]
    email_address: WireAddress,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFlag {
    #[serde(default)]
    flag_status: String,
}

#[derive(Deserialize)]
struct WireBody {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    from: Option<WireRecipient>,
    received_date_time: DateTime<Utc>,
    #[serde(default)]
    body_preview: String,
    #[serde(default)]
    is_read: bool,
    #[serde(default)]
    flag: Option<WireFlag>,
    #[serde(default)]
    to_recipients: Vec<WireRecipient>,
    #[serde(default)]
    cc_recipients: Vec<WireRecipient>,
    #[serde(default)]
    body: Option<WireBody>,
    #[serde(default)]
    parent_folder_id: Option<String>,
}

impl WireMessage {
    fn into_summary(self) -> EmailSummary {
        self.split().0
    }

    fn into_details(self) -> EmailDetails {
        let (summary, rest) = self.split();
        EmailDetails {
            summary,
            to: rest.to,
            cc: rest.cc,
            body: rest.body,
            folder: rest.folder,
        }
    }

    fn split(self) -> (EmailSummary, MessageRest) {
        let sender = self.from.map(|f| f.email_address).unwrap_or_default();
        let summary = EmailSummary {
            id: self.id,
            sender_name: sender.name,
            sender_address: sender.address,
            subject: self.subject.unwrap_or_default(),
            received_at: self.received_date_time,
            preview: self.body_preview.clone(),
            is_read: self.is_read,
            flagged: self
                .flag
                .is_some_and(|f| f.flag_status.eq_ignore_ascii_case("flagged")),
        };
        let addresses = |list: Vec<WireRecipient>| {
            list.into_iter()
                .map(|r| r.email_address.address)
                .collect::<Vec<_>>()
        };
        let rest = MessageRest {
            to: addresses(self.to_recipients),
            cc: addresses(self.cc_recipients),
            body: self.body.map(|b| b.content).unwrap_or(self.body_preview),
            folder: self.parent_folder_id,
        };
        (summary, rest)
    }
}

struct MessageRest {
    to: Vec<String>,
    cc: Vec<String>,
    body: String,
    folder: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDateTime {
    date_time: String,
}

impl WireDateTime {
    fn to_utc(&self) -> MailboxResult<DateTime<Utc>> {
        if let Ok(at) = DateTime::parse_from_rfc3339(&self.date_time) {
            return Ok(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.date_time, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| MailboxError::Backend(format!("bad timestamp {}: {e}", self.date_time)))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLocation {
    #[serde(default)]
    display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    start: WireDateTime,
    end: WireDateTime,
    #[serde(default)]
    location: Option<WireLocation>,
    #[serde(default)]
    attendees: Vec<WireRecipient>,
}

impl WireEvent {
    fn into_event(self) -> MailboxResult<CalendarEvent> {
        Ok(CalendarEvent {
            start: self.start.to_utc()?,
            end: self.end.to_utc()?,
            id: self.id,
            subject: self.subject.unwrap_or_default(),
            location: self
                .location
                .map(|l| l.display_name)
                .filter(|l| !l.is_empty()),
            attendees: self
                .attendees
                .into_iter()
                .map(|a| a.email_address.address)
                .collect(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFolder {
    id: String,
    display_name: String,
    #[serde(default)]
    parent_folder_id: Option<String>,
    #[serde(default)]
    unread_item_count: u32,
    #[serde(default)]
    total_item_count: u32,
}

impl From<WireFolder> for MailFolder {
    fn from(f: WireFolder) -> Self {
        Self {
            id: f.id,
            name: f.display_name,
            parent_id: f.parent_folder_id,
            unread_count: f.unread_item_count,
            total_count: f.total_item_count,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTaskList {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    wellknown_list_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTask {
    id: String,
    title: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    due_date_time: Option<WireDateTime>,
    #[serde(default)]
    body: Option<WireBody>,
}

impl WireTask {
    fn into_task(self) -> MailboxResult<TaskItem> {
        let due = match self.due_date_time {
            Some(ref due) => Some(due.to_utc()?),
            None => None,
        };
        Ok(TaskItem {
            id: self.id,
            title: self.title,
            due,
            completed: self.status.eq_ignore_ascii_case("completed"),
            body: self.body.map(|b| b.content).filter(|c| !c.is_empty()),
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireRuleConditions {
    #[serde(default)]
    from_addresses: Vec<WireRecipient>,
    #[serde(default)]
    subject_contains: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireRuleActions {
    #[serde(default)]
    move_to_folder: Option<String>,
    #[serde(default)]
    mark_as_read: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRule {
    id: String,
    display_name: String,
    #[serde(default = "enabled_by_default")]
    is_enabled: bool,
    #[serde(default)]
    conditions: WireRuleConditions,
    #[serde(default)]
    actions: WireRuleActions,
}

fn enabled_by_default() -> bool {
    true
}

impl From<WireRule> for MailRule {
    fn from(r: WireRule) -> Self {
        Self {
            id: r.id,
            name: r.display_name,
            enabled: r.is_enabled,
            from_address: r
                .conditions
                .from_addresses
                .into_iter()
                .next()
                .map(|a| a.email_address.address),
            subject_contains: r.conditions.subject_contains.into_iter().next(),
            move_to_folder: r.actions.move_to_folder,
            mark_read: r.actions.mark_as_read,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePerson {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    scored_email_addresses: Vec<WireScoredAddress>,
}

#[derive(Deserialize)]
struct WireScoredAddress {
    #[serde(default)]
    address: String,
}

#[async_trait]
impl MailboxClient for GraphMailbox {
    async fn search_messages(
        &self,
        query: &str,
        max_results: usize,
    ) -> MailboxResult<Vec<EmailSummary>> {
        let escaped = query.replace('"', "");
        self.message_page(
            "/me/messages",
            &[
                ("$search", format!("\"{escaped}\"")),
                ("$top", max_results.to_string()),
                ("$select", MESSAGE_FIELDS.to_owned()),
            ],
        )
        .await
    }

    async fn list_unread(&self, max_results: usize) -> MailboxResult<Vec<EmailSummary>> {
        self.message_page(
            "/me/mailFolders/inbox/messages",
            &[
                ("$filter", "isRead eq false".to_owned()),
                ("$orderby", "receivedDateTime desc".to_owned()),
                ("$top", max_results.to_string()),
                ("$select", MESSAGE_FIELDS.to_owned()),
            ],
        )
        .await
    }

    async fn get_message(&self, id: &str) -> MailboxResult<Option<EmailDetails>> {
        let path = format!("/me/messages/{}", segment(id));
        match self.get::<WireMessage>(&path, &[]).await {
            Ok(message) => Ok(Some(message.into_details())),
            Err(MailboxError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn send_message(&self, email: &OutgoingEmail) -> MailboxResult<()> {
        let body = json!({
            "message": {
                "subject": email.subject,
                "body": { "contentType": "Text", "content": email.body },
                "toRecipients": recipients(&email.to),
                "ccRecipients": recipients(&email.cc),
                "bccRecipients": recipients(&email.bcc),
            },
            "saveToSentItems": true,
        });
        self.send(Method::POST, "/me/sendMail", Some(body)).await
    }

    async fn reply_to_message(&self, id: &str, body: &str) -> MailboxResult<()> {
        let path = format!("/me/messages/{}/reply", segment(id));
        self.send(Method::POST, &path, Some(json!({ "comment": body })))
            .await
    }

    async fn forward_message(
        &self,
        id: &str,
        to: &[String],
        comment: Option<&str>,
    ) -> MailboxResult<()> {
        let path = format!("/me/messages/{}/forward", segment(id));
        let body = json!({
            "comment": comment.unwrap_or_default(),
            "toRecipients": recipients(to),
        });
        self.send(Method::POST, &path, Some(body)).await
    }

    async fn delete_message(&self, id: &str) -> MailboxResult<()> {
        let path = format!("/me/messages/{}", segment(id));
        self.send(Method::DELETE, &path, None).await
    }

    async fn move_message(&self, id: &str, folder: &str) -> MailboxResult<()> {
        let destination = self.folder_id(folder).await?;
        let path = format!("/me/messages/{}/move", segment(id));
        self.send(
            Method::POST,
            &path,
            Some(json!({ "destinationId": destination })),
        )
        .await
    }

    async fn flag_message(&self, id: &str, flagged: bool) -> MailboxResult<()> {
        let status = if flagged { "flagged" } else { "notFlagged" };
        let path = format!("/me/messages/{}", segment(id));
        self.send(
            Method::PATCH,
            &path,
            Some(json!({ "flag": { "flagStatus": status } })),
        )
        .await
    }

    async fn mark_read(&self, id: &str, read: bool) -> MailboxResult<()> {
        let path = format!("/me/messages/{}", segment(id));
        self.send(Method::PATCH, &path, Some(json!({ "isRead": read })))
            .await
    }

    async fn list_events(&self, days_ahead: u32) -> MailboxResult<Vec<CalendarEvent>> {
        let now = Utc::now();
        let until = now + Duration::days(i64::from(days_ahead));
        let page: Page<WireEvent> = self
            .get(
                "/me/calendarView",
                &[
                    (
                        "startDateTime",
                        now.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                    (
                        "endDateTime",
                        until.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                    ("$orderby", "start/dateTime".to_owned()),
                ],
            )
            .await?;
        page.value.into_iter().map(WireEvent::into_event).collect()
    }

    async fn create_event(&self, event: &NewEvent) -> MailboxResult<CalendarEvent> {
        let attendees: Vec<Value> = event
            .attendees
            .iter()
            .map(|a| json!({ "emailAddress": { "address": a }, "type": "required" }))
            .collect();
        let mut body = json!({
            "subject": event.subject,
            "start": graph_time(event.start),
            "end": graph_time(event.end),
            "attendees": attendees,
        });
        if let Some(ref location) = event.location {
            body["location"] = json!({ "displayName": location });
        }
        if let Some(ref text) = event.body {
            body["body"] = json!({ "contentType": "Text", "content": text });
        }
        let created: WireEvent = self.post("/me/events", body).await?;
        created.into_event()
    }

    async fn delete_event(&self, id: &str) -> MailboxResult<()> {
        let path = format!("/me/events/{}", segment(id));
        self.send(Method::DELETE, &path, None).await
    }

    async fn list_folders(&self) -> MailboxResult<Vec<MailFolder>> {
        let page: Page<WireFolder> = self
            .get("/me/mailFolders", &[("$top", "100".to_owned())])
            .await?;
        Ok(page.value.into_iter().map(MailFolder::from).collect())
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> MailboxResult<MailFolder> {
        let path = match parent {
            Some(parent) => {
                let parent_id = self.folder_id(parent).await?;
                format!("/me/mailFolders/{}/childFolders", segment(&parent_id))
            }
            None => "/me/mailFolders".to_owned(),
        };
        let created: WireFolder = self.post(&path, json!({ "displayName": name })).await?;
        Ok(created.into())
    }

    async fn rename_folder(&self, id: &str, name: &str) -> MailboxResult<()> {
        let path = format!("/me/mailFolders/{}", segment(id));
        self.send(Method::PATCH, &path, Some(json!({ "displayName": name })))
            .await
    }

    async fn delete_folder(&self, id: &str) -> MailboxResult<()> {
        let path = format!("/me/mailFolders/{}", segment(id));
        self.send(Method::DELETE, &path, None).await
    }

    async fn list_tasks(&self) -> MailboxResult<Vec<TaskItem>> {
        let list = self.default_task_list().await?;
        let path = format!("/me/todo/lists/{}/tasks", segment(&list));
        let page: Page<WireTask> = self.get(&path, &[]).await?;
        page.value.into_iter().map(WireTask::into_task).collect()
    }

    async fn create_task(&self, task: &NewTask) -> MailboxResult<TaskItem> {
        let list = self.default_task_list().await?;
        let path = format!("/me/todo/lists/{}/tasks", segment(&list));
        let mut body = json!({ "title": task.title });
        if let Some(due) = task.due {
            body["dueDateTime"] = graph_time(due);
        }
        if let Some(ref text) = task.body {
            body["body"] = json!({ "contentType": "text", "content": text });
        }
        let created: WireTask = self.post(&path, body).await?;
        created.into_task()
    }

    async fn complete_task(&self, id: &str) -> MailboxResult<()> {
        let list = self.default_task_list().await?;
        let path = format!("/me/todo/lists/{}/tasks/{}", segment(&list), segment(id));
        self.send(Method::PATCH, &path, Some(json!({ "status": "completed" })))
            .await
    }

    async fn delete_task(&self, id: &str) -> MailboxResult<()> {
        let list = self.default_task_list().await?;
        let path = format!("/me/todo/lists/{}/tasks/{}", segment(&list), segment(id));
        self.send(Method::DELETE, &path, None).await
    }

    async fn list_rules(&self) -> MailboxResult<Vec<MailRule>> {
        let page: Page<WireRule> = self
            .get("/me/mailFolders/inbox/messageRules", &[])
            .await?;
        Ok(page.value.into_iter().map(MailRule::from).collect())
    }

    async fn create_rule(&self, rule: &NewRule) -> MailboxResult<MailRule> {
        let mut conditions = json!({});
        if let Some(ref from) = rule.from_address {
            conditions["fromAddresses"] = recipients(std::slice::from_ref(from));
        }
        if let Some(ref subject) = rule.subject_contains {
            conditions["subjectContains"] = json!([subject]);
        }
        let mut actions = json!({ "stopProcessingRules": false });
        if let Some(ref folder) = rule.move_to_folder {
            let folder_id = self.folder_id(folder).await?;
            actions["moveToFolder"] = json!(folder_id);
        }
        if rule.mark_read {
            actions["markAsRead"] = json!(true);
        }
        let body = json!({
            "displayName": rule.name,
            "sequence": 1,
            "isEnabled": true,
            "conditions": conditions,
            "actions": actions,
        });
        let created: WireRule = self
            .post("/me/mailFolders/inbox/messageRules", body)
            .await?;
        Ok(created.into())
    }

    async fn delete_rule(&self, id: &str) -> MailboxResult<()> {
        let path = format!("/me/mailFolders/inbox/messageRules/{}", segment(id));
        self.send(Method::DELETE, &path, None).await
    }

    async fn search_contacts(&self, query: &str) -> MailboxResult<Vec<ContactEntry>> {
        let page: Page<WirePerson> = self
            .get("/me/people", &[("$search", format!("\"{}\"", query.replace('"', "")))])
            .await?;
        Ok(page
            .value
            .into_iter()
            .filter_map(|p| {
                let email = p.scored_email_addresses.into_iter().next()?.address;
                (!email.is_empty()).then(|| ContactEntry {
                    display_name: p.display_name,
                    email,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn static_provider_without_token_is_unauthenticated() {
        let provider = StaticTokenProvider::new(None);
        let err = provider.bearer_token().await.unwrap_err();
        assert!(matches!(err, MailboxError::Unauthenticated(_)));

        let blank = StaticTokenProvider::new(Some(RedactedString::new("")));
        assert!(blank.bearer_token().await.is_err());
    }

    #[test]
    fn map_http_error_classifies_statuses() {
        use reqwest::StatusCode;
        assert!(matches!(
            map_http_error(StatusCode::UNAUTHORIZED, "{}"),
            MailboxError::Unauthenticated(_)
        ));
        assert!(matches!(
            map_http_error(StatusCode::FORBIDDEN, "{}"),
            MailboxError::Unauthenticated(_)
        ));
        assert!(matches!(
            map_http_error(StatusCode::NOT_FOUND, "{}"),
            MailboxError::NotFound(_)
        ));
        assert!(matches!(
            map_http_error(StatusCode::TOO_MANY_REQUESTS, "{}"),
            MailboxError::RateLimited(_)
        ));
        assert!(matches!(
            map_http_error(StatusCode::BAD_GATEWAY, "{}"),
            MailboxError::Backend(_)
        ));
    }

    #[test]
    fn error_bodies_are_redacted() {
        let err = map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"token Bearer abc.def.ghi is expired"}}"#,
        );
        let text = err.to_string();
        assert!(!text.contains("abc.def.ghi"), "leaked token: {text}");
    }

    #[test]
    fn wire_message_maps_sender_and_flag() {
        let wire: WireMessage = serde_json::from_value(json!({
            "id": "AAMk1",
            "subject": "Invoice",
            "from": { "emailAddress": { "name": "Jane", "address": "jane@example.com" } },
            "receivedDateTime": "2026-03-01T09:30:00Z",
            "bodyPreview": "Attached",
            "isRead": true,
            "flag": { "flagStatus": "flagged" }
        }))
        .unwrap();
        let summary = wire.into_summary();
        assert_eq!(summary.sender(), "Jane <jane@example.com>");
        assert!(summary.flagged);
        assert!(summary.is_read);
    }

    #[test]
    fn naive_graph_timestamps_are_utc() {
        let at = WireDateTime {
            date_time: "2026-03-01T09:00:00.0000000".to_owned(),
        }
        .to_utc()
        .unwrap();
        assert_eq!(at.to_rfc3339(), "2026-03-01T09:00:00+00:00");
    }

    #[test]
    fn base_url_is_trimmed() {
        let mailbox = GraphMailbox::new(
            "https://example.test/v1.0/",
            Box::new(StaticTokenProvider::default()),
        );
        assert_eq!(mailbox.base_url(), "https://example.test/v1.0");
    }
}
