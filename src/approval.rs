//! Human approval gate for irreversible actions.
//!
//! Gated invocations are parked here as [`PendingApproval`] records until
//! the user decides. The gate holds no task, channel or lock while waiting:
//! a decision may arrive at any later time from any caller, and the record
//! is the only state retained.
//!
//! The gate never executes anything. [`ApprovalGate::resolve`] removes the
//! record and hands it back; dispatching an approved invocation is the agent
//! loop's job. Because the record is removed on the first resolution, a
//! second `resolve` for the same id is a harmless [`ApprovalOutcome::NotFound`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::actions::ToolInvocation;

/// An invocation waiting for a human decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingApproval {
    /// Opaque token used to resolve this entry.
    pub id: String,
    pub invocation: ToolInvocation,
    /// What will happen, in words the user can judge.
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// The user's decision on a pending approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { comment: Option<String> },
}

impl Decision {
    pub fn reject(comment: impl Into<String>) -> Self {
        let comment = comment.into();
        Self::Reject {
            comment: (!comment.trim().is_empty()).then_some(comment),
        }
    }
}

/// Result of resolving an id.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    /// The caller must now dispatch the invocation.
    Approved(PendingApproval),
    /// The invocation must not run; the comment is fed back to the model.
    Rejected {
        pending: PendingApproval,
        comment: Option<String>,
    },
    /// Unknown or already-resolved id; nothing happened.
    NotFound,
}

/// Ordered set of pending approvals for one session.
#[derive(Debug, Default)]
pub struct ApprovalGate {
    pending: Vec<PendingApproval>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `invocation` and return the new record.
    pub fn submit(
        &mut self,
        invocation: ToolInvocation,
        description: impl Into<String>,
    ) -> PendingApproval {
        let pending = PendingApproval {
            id: Uuid::new_v4().to_string(),
            invocation,
            description: description.into(),
            created_at: Utc::now(),
        };
        self.pending.push(pending.clone());
        pending
    }

    /// Consume the pending entry `id` with `decision`.
    ///
    /// Entries may be resolved in any order.
    pub fn resolve(&mut self, id: &str, decision: Decision) -> ApprovalOutcome {
        let id = id.trim();
        let Some(index) = self.pending.iter().position(|p| p.id == id) else {
            return ApprovalOutcome::NotFound;
        };
        let pending = self.pending.remove(index);
        match decision {
            Decision::Approve => ApprovalOutcome::Approved(pending),
            Decision::Reject { comment } => ApprovalOutcome::Rejected { pending, comment },
        }
    }

    /// Pending entries, oldest first. No side effects.
    pub fn list(&self) -> &[PendingApproval] {
        &self.pending
    }

    pub fn get(&self, id: &str) -> Option<&PendingApproval> {
        self.pending.iter().find(|p| p.id == id.trim())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending entry.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::actions::ActionParams;

    fn invocation(name: &str) -> ToolInvocation {
        ToolInvocation::new(name, ActionParams::new())
    }

    #[test]
    fn submit_assigns_unique_ids() {
        let mut gate = ApprovalGate::new();
        let a = gate.submit(invocation("send_email"), "send");
        let b = gate.submit(invocation("delete_email"), "delete");
        assert_ne!(a.id, b.id);
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn approve_consumes_exactly_once() {
        let mut gate = ApprovalGate::new();
        let p = gate.submit(invocation("send_email"), "send");
        assert!(matches!(
            gate.resolve(&p.id, Decision::Approve),
            ApprovalOutcome::Approved(ref got) if got.id == p.id
        ));
        assert_eq!(gate.resolve(&p.id, Decision::Approve), ApprovalOutcome::NotFound);
        assert_eq!(
            gate.resolve(&p.id, Decision::reject("too late")),
            ApprovalOutcome::NotFound
        );
        assert!(gate.is_empty());
    }

    #[test]
    fn reject_returns_comment() {
        let mut gate = ApprovalGate::new();
        let p = gate.submit(invocation("delete_email"), "delete");
        match gate.resolve(&p.id, Decision::reject("keep it")) {
            ApprovalOutcome::Rejected { pending, comment } => {
                assert_eq!(pending.invocation.action, "delete_email");
                assert_eq!(comment.as_deref(), Some("keep it"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn blank_rejection_comment_is_none() {
        assert_eq!(Decision::reject("  "), Decision::Reject { comment: None });
    }

    #[test]
    fn entries_resolve_out_of_order() {
        let mut gate = ApprovalGate::new();
        let first = gate.submit(invocation("a"), "a");
        let second = gate.submit(invocation("b"), "b");
        assert!(matches!(
            gate.resolve(&second.id, Decision::Approve),
            ApprovalOutcome::Approved(_)
        ));
        assert_eq!(gate.list().len(), 1);
        assert_eq!(gate.list()[0].id, first.id);
    }

    #[test]
    fn list_is_side_effect_free() {
        let mut gate = ApprovalGate::new();
        gate.submit(invocation("a"), "a");
        let before = gate.list().to_vec();
        let again = gate.list().to_vec();
        assert_eq!(before, again);
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut gate = ApprovalGate::new();
        assert_eq!(gate.resolve("nope", Decision::Approve), ApprovalOutcome::NotFound);
    }
}
