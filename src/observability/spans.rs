//! Span names and field keys used across the crate.
//!
//! ```text
//! mailpilot.agent.cycle
//!   ├─> mailpilot.model.request
//!   └─> mailpilot.action.dispatch
//! mailpilot.approval.resolve
//! ```

/// One model round-trip plus the dispatches it triggers.
pub const SPAN_AGENT_CYCLE: &str = "mailpilot.agent.cycle";

/// A single completion request (including rate-limit retries).
pub const SPAN_MODEL_REQUEST: &str = "mailpilot.model.request";

/// Execution of one action against the mailbox.
pub const SPAN_ACTION_DISPATCH: &str = "mailpilot.action.dispatch";

/// A human decision on a pending approval.
pub const SPAN_APPROVAL_RESOLVE: &str = "mailpilot.approval.resolve";

/// Iteration number within the agent loop (1-indexed).
pub const FIELD_ITERATION: &str = "iteration";

/// Configured iteration cap.
pub const FIELD_MAX_ITERATIONS: &str = "max_iterations";

/// Canonical action name.
pub const FIELD_ACTION: &str = "action";

/// Approval identifier.
pub const FIELD_APPROVAL_ID: &str = "approval_id";

/// Model identifier.
pub const FIELD_MODEL: &str = "model";

/// Attempt number for retried requests (1-indexed).
pub const FIELD_ATTEMPT: &str = "attempt";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_names_share_crate_prefix() {
        for name in [
            SPAN_AGENT_CYCLE,
            SPAN_MODEL_REQUEST,
            SPAN_ACTION_DISPATCH,
            SPAN_APPROVAL_RESOLVE,
        ] {
            assert!(name.starts_with("mailpilot."), "{name}");
        }
    }
}
