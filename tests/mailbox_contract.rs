//! Mailbox REST Client Contract Tests
//!
//! These tests verify the HTTP shape of [`GraphMailbox`] requests and the
//! mapping of provider responses:
//! - Bearer token is attached to every request
//! - Response pages are mapped onto domain types
//! - HTTP error statuses are mapped to `MailboxError` kinds
//! - A missing token fails before any request is sent

use mailpilot::mailbox::{
    GraphMailbox, MailboxClient, MailboxError, NewTask, OutgoingEmail, StaticTokenProvider,
};
use mailpilot::observability::RedactedString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mailbox(server: &MockServer) -> GraphMailbox {
    let tokens = StaticTokenProvider::new(Some(RedactedString::new("test-token")));
    GraphMailbox::new(server.uri(), Box::new(tokens))
}

fn message_json(id: &str, subject: &str, is_read: bool) -> serde_json::Value {
    json!({
        "id": id,
        "subject": subject,
        "from": { "emailAddress": { "name": "Jane Cooper", "address": "jane@example.com" } },
        "receivedDateTime": "2026-03-01T10:00:00Z",
        "bodyPreview": "Please find the invoice attached.",
        "isRead": is_read,
        "flag": { "flagStatus": "notFlagged" }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response Mapping
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_sends_bearer_token_and_maps_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/messages"))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("$top", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [message_json("m1", "Invoice #2041", false)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = mailbox(&server).search_messages("invoice", 5).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "m1");
    assert_eq!(results[0].subject, "Invoice #2041");
    assert_eq!(results[0].sender_name, "Jane Cooper");
    assert_eq!(results[0].sender_address, "jane@example.com");
    assert!(!results[0].is_read);
}

#[tokio::test]
async fn send_mail_posts_recipients_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/me/sendMail"))
        .and(body_partial_json(json!({
            "message": {
                "subject": "Hi",
                "body": { "contentType": "Text", "content": "Hello" },
                "toRecipients": [{ "emailAddress": { "address": "jane@x.com" } }]
            },
            "saveToSentItems": true
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let email = OutgoingEmail {
        to: vec!["jane@x.com".into()],
        subject: "Hi".into(),
        body: "Hello".into(),
        cc: Vec::new(),
        bcc: Vec::new(),
    };
    mailbox(&server).send_message(&email).await.unwrap();
}

#[tokio::test]
async fn tasks_use_the_default_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/todo/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": "list-other", "displayName": "Groceries" },
                { "id": "list-default", "displayName": "Tasks", "wellknownListName": "defaultList" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/me/todo/lists/list-default/tasks"))
        .and(body_partial_json(json!({ "title": "Pay invoice" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "t1",
            "title": "Pay invoice",
            "status": "notStarted"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let task = mailbox(&server)
        .create_task(&NewTask {
            title: "Pay invoice".into(),
            due: None,
            body: None,
        })
        .await
        .unwrap();
    assert_eq!(task.id, "t1");
    assert!(!task.completed);
}

#[tokio::test]
async fn configured_task_list_is_matched_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/todo/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": "list-default", "displayName": "Tasks", "wellknownListName": "defaultList" },
                { "id": "list-work", "displayName": "Work" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/todo/lists/list-work/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = mailbox(&server)
        .with_task_list("work")
        .list_tasks()
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

// ────────────────────────────────────────────────────────────────────────────
// Error Mapping
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_maps_to_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/mailFolders/inbox/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "InvalidAuthenticationToken", "message": "Access token has expired." }
        })))
        .mount(&server)
        .await;

    let err = mailbox(&server).list_unread(10).await.unwrap_err();
    assert!(matches!(err, MailboxError::Unauthenticated(_)), "{err:?}");
    assert!(err.to_string().contains("expired"));
}

#[tokio::test]
async fn missing_message_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/messages/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ErrorItemNotFound", "message": "The specified object was not found." }
        })))
        .mount(&server)
        .await;

    let message = mailbox(&server).get_message("gone").await.unwrap();
    assert!(message.is_none());
}

#[tokio::test]
async fn throttling_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/me/messages/m1"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = mailbox(&server).delete_message("m1").await.unwrap_err();
    assert!(matches!(err, MailboxError::RateLimited(_)), "{err:?}");
}

#[tokio::test]
async fn missing_token_fails_without_a_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = GraphMailbox::new(server.uri(), Box::new(StaticTokenProvider::new(None)));
    let err = client.list_folders().await.unwrap_err();
    assert!(matches!(err, MailboxError::Unauthenticated(_)), "{err:?}");
}
