//! Domain types exchanged with the mailbox provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters of body text shown in a preview line.
pub const PREVIEW_CHARS: usize = 120;

/// One search hit: enough to identify, attribute and preview a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSummary {
    /// Provider message identifier.
    pub id: String,
    /// Sender display name (may be empty).
    pub sender_name: String,
    /// Sender email address.
    pub sender_address: String,
    /// Subject line.
    pub subject: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Short body preview.
    pub preview: String,
    /// Whether the message has been read.
    #[serde(default)]
    pub is_read: bool,
    /// Whether the message is flagged for follow-up.
    #[serde(default)]
    pub flagged: bool,
}

impl EmailSummary {
    /// `Name <address>`, or just the address when no name is known.
    pub fn sender(&self) -> String {
        if self.sender_name.trim().is_empty() {
            self.sender_address.clone()
        } else {
            format!("{} <{}>", self.sender_name, self.sender_address)
        }
    }

    /// One-line summary used in tool results and prompts.
    pub fn format_line(&self) -> String {
        let unread = if self.is_read { "" } else { "[unread] " };
        let flag = if self.flagged { "[flagged] " } else { "" };
        format!(
            "{unread}{flag}[id: {}] From: {} | Subject: {} | {} | {}",
            self.id,
            self.sender(),
            self.subject,
            self.received_at.format("%Y-%m-%d %H:%M"),
            preview_text(&self.preview),
        )
    }
}

/// Full message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDetails {
    /// Header fields shared with search hits.
    pub summary: EmailSummary,
    /// Primary recipients.
    #[serde(default)]
    pub to: Vec<String>,
    /// CC recipients.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Plain-text body.
    pub body: String,
    /// Folder the message lives in.
    #[serde(default)]
    pub folder: Option<String>,
}

impl EmailDetails {
    /// Render headers followed by the complete body.
    pub fn format_full(&self) -> String {
        let mut parts = vec![
            format!("Subject: {}", self.summary.subject),
            format!("From: {}", self.summary.sender()),
            format!("To: {}", self.to.join(", ")),
        ];
        if !self.cc.is_empty() {
            parts.push(format!("Cc: {}", self.cc.join(", ")));
        }
        parts.push(format!(
            "Date: {}",
            self.summary.received_at.format("%Y-%m-%d %H:%M UTC")
        ));
        if let Some(ref folder) = self.folder {
            parts.push(format!("Folder: {folder}"));
        }
        parts.push(format!("[id: {}]", self.summary.id));
        parts.push(String::new());
        parts.push(self.body.clone());
        parts.join("\n")
    }
}

/// A message to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
}

/// A calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl CalendarEvent {
    /// One-line rendering: time range, subject, location and attendees.
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "[id: {}] {} – {} {}",
            self.id,
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%H:%M"),
            self.subject
        );
        if let Some(ref location) = self.location {
            line.push_str(&format!(" @ {location}"));
        }
        if !self.attendees.is_empty() {
            line.push_str(&format!(" (with {})", self.attendees.join(", ")));
        }
        line
    }
}

/// Data for a new calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// A mail folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub total_count: u32,
}

impl MailFolder {
    pub fn format_line(&self) -> String {
        format!(
            "[id: {}] {} ({} unread / {} total)",
            self.id, self.name, self.unread_count, self.total_count
        )
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub body: Option<String>,
}

impl TaskItem {
    pub fn format_line(&self) -> String {
        let mark = if self.completed { "[x]" } else { "[ ]" };
        match self.due {
            Some(due) => format!(
                "{mark} [id: {}] {} (due {})",
                self.id,
                self.title,
                due.format("%Y-%m-%d")
            ),
            None => format!("{mark} [id: {}] {}", self.id, self.title),
        }
    }
}

/// Data for a new to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
}

/// An inbox rule: conditions plus actions applied to incoming mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub subject_contains: Option<String>,
    #[serde(default)]
    pub move_to_folder: Option<String>,
    #[serde(default)]
    pub mark_read: bool,
}

fn default_true() -> bool {
    true
}

impl MailRule {
    pub fn format_line(&self) -> String {
        let mut conditions = Vec::new();
        if let Some(ref from) = self.from_address {
            conditions.push(format!("from {from}"));
        }
        if let Some(ref subject) = self.subject_contains {
            conditions.push(format!("subject contains \"{subject}\""));
        }
        let mut actions = Vec::new();
        if let Some(ref folder) = self.move_to_folder {
            actions.push(format!("move to {folder}"));
        }
        if self.mark_read {
            actions.push("mark read".to_owned());
        }
        let state = if self.enabled { "" } else { " (disabled)" };
        format!(
            "[id: {}] {}{state}: when {} then {}",
            self.id,
            self.name,
            if conditions.is_empty() {
                "any message".to_owned()
            } else {
                conditions.join(" and ")
            },
            if actions.is_empty() {
                "do nothing".to_owned()
            } else {
                actions.join(", ")
            }
        )
    }
}

/// Data for a new inbox rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub subject_contains: Option<String>,
    #[serde(default)]
    pub move_to_folder: Option<String>,
    #[serde(default)]
    pub mark_read: bool,
}

/// A person from the address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub display_name: String,
    pub email: String,
}

/// Collapse whitespace and cap a preview at [`PREVIEW_CHARS`] characters.
pub fn preview_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > PREVIEW_CHARS {
        let head: String = collapsed.chars().take(PREVIEW_CHARS).collect();
        format!("{head}…")
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary() -> EmailSummary {
        EmailSummary {
            id: "m1".to_owned(),
            sender_name: "Jane Doe".to_owned(),
            sender_address: "jane@example.com".to_owned(),
            subject: "Invoice 42".to_owned(),
            received_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            preview: "Please find the   invoice\nattached.".to_owned(),
            is_read: false,
            flagged: false,
        }
    }

    #[test]
    fn sender_falls_back_to_address() {
        let mut s = summary();
        assert_eq!(s.sender(), "Jane Doe <jane@example.com>");
        s.sender_name = " ".to_owned();
        assert_eq!(s.sender(), "jane@example.com");
    }

    #[test]
    fn format_line_marks_unread_and_collapses_preview() {
        let line = summary().format_line();
        assert!(line.starts_with("[unread] [id: m1]"));
        assert!(line.contains("2026-03-01 09:30"));
        assert!(line.contains("Please find the invoice attached."));
    }

    #[test]
    fn preview_is_capped() {
        let long = "word ".repeat(100);
        let preview = preview_text(&long);
        assert!(preview.ends_with('…'));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 1);
    }

    #[test]
    fn rule_line_lists_conditions_and_actions() {
        let rule = MailRule {
            id: "r1".to_owned(),
            name: "Newsletters".to_owned(),
            enabled: true,
            from_address: Some("news@example.com".to_owned()),
            subject_contains: None,
            move_to_folder: Some("Reading".to_owned()),
            mark_read: true,
        };
        assert_eq!(
            rule.format_line(),
            "[id: r1] Newsletters: when from news@example.com then move to Reading, mark read"
        );
    }
}
