//! Per-conversation state.
//!
//! An [`AgentSession`] is the aggregate root of one user conversation: it
//! owns the [`ConversationMemory`] (turns, last search results, known
//! contacts) and the [`ApprovalGate`]. Sessions share no mutable state, so
//! independent sessions may run fully in parallel.

pub mod memory;

pub use memory::{
    ConversationMemory, DEFAULT_MEMORY_CAPACITY, Role, SearchResultSet, ToolStatus, Turn,
};

use crate::approval::ApprovalGate;

/// State for one conversation.
#[derive(Debug, Default)]
pub struct AgentSession {
    pub memory: ConversationMemory,
    pub approvals: ApprovalGate,
}

impl AgentSession {
    pub fn new(memory_capacity: usize) -> Self {
        Self {
            memory: ConversationMemory::new(memory_capacity),
            approvals: ApprovalGate::new(),
        }
    }

    /// Clear memory, search results, contacts and pending approvals together.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.approvals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionParams, ToolInvocation};

    #[test]
    fn reset_clears_memory_and_approvals() {
        let mut session = AgentSession::new(10);
        session.memory.append(Turn::user("delete it"));
        session.memory.record_contact("Jane", "jane@x.com");
        session.approvals.submit(
            ToolInvocation::new("delete_email", ActionParams::new()),
            "delete message m1",
        );
        session.reset();
        assert!(session.memory.is_empty());
        assert!(session.memory.contacts().is_empty());
        assert!(session.approvals.is_empty());
    }
}
