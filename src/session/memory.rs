//! Bounded conversation memory with derived side context.
//!
//! Turns live in a ring of fixed capacity; once full, every append evicts
//! the oldest turn permanently. Alongside the turns the memory keeps the
//! last search result set (replaced wholesale) and a directory of known
//! contacts (name → address, most recent write wins).

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::ToolInvocation;
use crate::mailbox::EmailSummary;

/// Default number of turns retained.
pub const DEFAULT_MEMORY_CAPACITY: usize = 50;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    ToolResult,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Agent => "Assistant",
            Self::ToolResult => "Action result",
        }
    }
}

/// Outcome attached to a tool-result turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Failure,
    /// Waiting for a human decision.
    Pending,
}

/// One immutable entry of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<ToolInvocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::plain(Role::Agent, content)
    }

    pub fn tool_result(
        invocation: ToolInvocation,
        status: ToolStatus,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            timestamp: Utc::now(),
            invocation: Some(invocation),
            status: Some(status),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            invocation: None,
            status: None,
        }
    }

    /// Rendering used in prompts.
    pub fn render(&self) -> String {
        match (&self.invocation, self.status) {
            (Some(inv), Some(status)) => {
                let tag = match status {
                    ToolStatus::Success => "ok",
                    ToolStatus::Failure => "failed",
                    ToolStatus::Pending => "pending approval",
                };
                format!("{} [{}, {tag}]: {}", self.role.label(), inv.action, self.content)
            }
            _ => format!("{}: {}", self.role.label(), self.content),
        }
    }
}

/// The most recent batch of mailbox search hits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultSet {
    pub query: String,
    pub items: Vec<EmailSummary>,
}

impl SearchResultSet {
    pub fn new(query: impl Into<String>, items: Vec<EmailSummary>) -> Self {
        Self {
            query: query.into(),
            items,
        }
    }
}

/// Bounded turn log plus search/contact side context.
#[derive(Debug)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    capacity: usize,
    last_search: Option<SearchResultSet>,
    contacts: BTreeMap<String, String>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl ConversationMemory {
    /// Create an empty memory holding at most `capacity` turns (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
            last_search: None,
            contacts: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn, evicting the oldest once over capacity.
    pub fn append(&mut self, turn: Turn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// The last `k` turns, oldest first.
    pub fn recent_window(&self, k: usize) -> Vec<&Turn> {
        let skip = self.turns.len().saturating_sub(k);
        self.turns.iter().skip(skip).collect()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent user message still in memory.
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }

    /// Replace the last search results and learn their senders.
    pub fn set_last_search(&mut self, results: SearchResultSet) {
        for item in &results.items {
            self.record_contact(&item.sender_name, &item.sender_address);
        }
        self.last_search = Some(results);
    }

    pub fn last_search(&self) -> Option<&SearchResultSet> {
        self.last_search.as_ref()
    }

    /// Upsert `name → address`. Blank names or addresses are ignored.
    pub fn record_contact(&mut self, name: &str, address: &str) {
        let (name, address) = (name.trim(), address.trim());
        if name.is_empty() || address.is_empty() {
            return;
        }
        self.contacts.insert(name.to_owned(), address.to_owned());
    }

    /// Known contacts, sorted by name.
    pub fn contacts(&self) -> &BTreeMap<String, String> {
        &self.contacts
    }

    /// Clear turns, search results and contacts.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.last_search = None;
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use chrono::TimeZone;

    use super::*;
    use crate::actions::ActionParams;

    fn summary(id: &str, name: &str, address: &str) -> EmailSummary {
        EmailSummary {
            id: id.to_owned(),
            sender_name: name.to_owned(),
            sender_address: address.to_owned(),
            subject: "s".to_owned(),
            received_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            preview: String::new(),
            is_read: false,
            flagged: false,
        }
    }

    #[test]
    fn eviction_keeps_most_recent_in_order() {
        let mut memory = ConversationMemory::new(5);
        for i in 0..12 {
            memory.append(Turn::user(format!("m{i}")));
            assert!(memory.len() <= 5);
        }
        let window: Vec<&str> = memory
            .recent_window(5)
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(window, vec!["m7", "m8", "m9", "m10", "m11"]);
    }

    #[test]
    fn recent_window_smaller_than_history() {
        let mut memory = ConversationMemory::new(50);
        for i in 0..20 {
            memory.append(Turn::agent(format!("a{i}")));
        }
        let window = memory.recent_window(3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "a17");
        assert_eq!(memory.recent_window(100).len(), 20);
    }

    #[test]
    fn search_results_replace_and_contacts_accumulate() {
        let mut memory = ConversationMemory::default();
        memory.set_last_search(SearchResultSet::new(
            "invoice",
            vec![summary("1", "Jane", "jane@old.com")],
        ));
        memory.set_last_search(SearchResultSet::new(
            "lunch",
            vec![
                summary("2", "Marcus", "marcus@x.com"),
                summary("3", "Jane", "jane@new.com"),
            ],
        ));
        let search = memory.last_search().unwrap();
        assert_eq!(search.query, "lunch");
        assert_eq!(search.items.len(), 2);
        assert_eq!(memory.contacts().len(), 2);
        assert_eq!(memory.contacts()["Jane"], "jane@new.com");
    }

    #[test]
    fn reset_clears_everything() {
        let mut memory = ConversationMemory::new(3);
        memory.append(Turn::user("hi"));
        memory.record_contact("Jane", "jane@x.com");
        memory.set_last_search(SearchResultSet::new("q", Vec::new()));
        memory.reset();
        assert!(memory.is_empty());
        assert!(memory.last_search().is_none());
        assert!(memory.contacts().is_empty());
    }

    #[test]
    fn tool_result_render_shows_status() {
        let turn = Turn::tool_result(
            ToolInvocation::new("delete_email", ActionParams::new()),
            ToolStatus::Failure,
            "rejected by user: keep it",
        );
        assert_eq!(
            turn.render(),
            "Action result [delete_email, failed]: rejected by user: keep it"
        );
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut memory = ConversationMemory::new(0);
        memory.append(Turn::user("a"));
        memory.append(Turn::user("b"));
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.last_user_message(), Some("b"));
    }
}
