//! Prompt assembly.
//!
//! Every model call gets one self-contained prompt built from the preamble,
//! the registry catalog, the directive format, known contacts, the last
//! search results, the recent conversation window and the current request.
//! Given the same inputs the output is byte-identical.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::actions::ActionRegistry;
use crate::parser::DIRECTIVE_FORMAT;
use crate::session::ConversationMemory;

/// Behaviour preamble used when the config does not override it.
pub const DEFAULT_PREAMBLE: &str = "You are an email and calendar assistant acting on the user's mailbox. \
You can search, read, organise, draft and send email, manage calendar events, folders, tasks and inbox rules. \
Use the actions below to look things up instead of guessing ids or addresses. \
Actions that send, reply, forward, delete or create calendar events need the user's approval; \
propose them once and wait. After an action result arrives, decide whether more actions are needed \
or answer the user directly. If an action result says re-authentication is needed, tell the user to sign in again.";

/// Inputs that vary per call.
pub struct PromptContext<'a> {
    pub preamble: &'a str,
    pub registry: &'a ActionRegistry,
    pub memory: &'a ConversationMemory,
    pub recent_window: usize,
    pub now: DateTime<Utc>,
}

/// Build the full prompt text.
pub fn build_prompt(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();
    out.push_str(ctx.preamble.trim());
    let _ = writeln!(
        out,
        "\n\nCurrent time: {}",
        ctx.now.format("%Y-%m-%d %H:%M UTC (%A)")
    );

    out.push_str("\n## Available actions\n");
    out.push_str(&ctx.registry.render_catalog());

    out.push_str("\n## Action format\n");
    out.push_str(DIRECTIVE_FORMAT);
    out.push('\n');

    let contacts = ctx.memory.contacts();
    if !contacts.is_empty() {
        out.push_str("\n## Known contacts\n");
        for (name, address) in contacts {
            let _ = writeln!(out, "- {name}: {address}");
        }
    }

    if let Some(search) = ctx.memory.last_search() {
        let _ = writeln!(out, "\n## Last search results (query: \"{}\")", search.query);
        if search.items.is_empty() {
            out.push_str("(no results)\n");
        }
        for (i, item) in search.items.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, item.format_line());
        }
    }

    let window = ctx.memory.recent_window(ctx.recent_window);
    if !window.is_empty() {
        out.push_str("\n## Conversation so far\n");
        for turn in window {
            out.push_str(&turn.render());
            out.push('\n');
        }
    }

    if let Some(request) = ctx.memory.last_user_message() {
        let _ = writeln!(out, "\n## Current request\n{request}");
    }

    out.push_str("\nAssistant:");
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::actions::builtin_registry;
    use crate::mailbox::InMemoryMailbox;
    use crate::session::Turn;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    #[test]
    fn prompt_contains_every_section_in_order() {
        let registry = builtin_registry(Arc::new(InMemoryMailbox::new()), 10).unwrap();
        let mut memory = ConversationMemory::new(10);
        memory.record_contact("Jane", "jane@x.com");
        memory.append(Turn::user("email jane"));

        let prompt = build_prompt(&PromptContext {
            preamble: DEFAULT_PREAMBLE,
            registry: &registry,
            memory: &memory,
            recent_window: 10,
            now: now(),
        });

        let order = [
            "You are an email and calendar assistant",
            "Current time: 2026-03-02 08:00 UTC (Monday)",
            "## Available actions",
            "- send_email [REQUIRES APPROVAL]",
            "## Action format",
            "## Known contacts\n- Jane: jane@x.com",
            "## Conversation so far\nUser: email jane",
            "## Current request\nemail jane",
        ];
        let mut last = 0;
        for needle in order {
            let at = prompt.find(needle).unwrap_or_else(|| panic!("missing {needle:?}"));
            assert!(at >= last, "{needle:?} out of order");
            last = at;
        }
        assert!(!prompt.contains("## Last search results"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let registry = builtin_registry(Arc::new(InMemoryMailbox::new()), 10).unwrap();
        let mut memory = ConversationMemory::new(10);
        memory.append(Turn::user("hi"));
        let ctx = PromptContext {
            preamble: "P",
            registry: &registry,
            memory: &memory,
            recent_window: 3,
            now: now(),
        };
        assert_eq!(build_prompt(&ctx), build_prompt(&ctx));
    }

    #[test]
    fn window_limits_history() {
        let registry = builtin_registry(Arc::new(InMemoryMailbox::new()), 10).unwrap();
        let mut memory = ConversationMemory::new(50);
        for i in 0..20 {
            memory.append(Turn::user(format!("message number {i}")));
        }
        let prompt = build_prompt(&PromptContext {
            preamble: "P",
            registry: &registry,
            memory: &memory,
            recent_window: 2,
            now: now(),
        });
        assert!(prompt.contains("User: message number 19"));
        assert!(prompt.contains("User: message number 18"));
        assert!(!prompt.contains("User: message number 17"));
    }
}
