//! Observability helpers: span naming and secret redaction.
//!
//! # Tracing
//!
//! Structured spans are emitted at key points of an agent cycle:
//! - Model requests
//! - Agent cycles (one per model round-trip)
//! - Action dispatches
//! - Approval resolution
//!
//! # Secret Redaction
//!
//! Use [`RedactedString`](redact::RedactedString) for API keys and bearer
//! tokens so they never reach logs, and [`redact_secrets`](redact::redact_secrets)
//! before logging HTTP error bodies.

pub mod redact;
pub mod spans;

pub use redact::{RedactedString, redact_secrets};
pub use spans::{
    FIELD_ACTION, FIELD_APPROVAL_ID, FIELD_ATTEMPT, FIELD_ITERATION, FIELD_MAX_ITERATIONS,
    FIELD_MODEL, SPAN_ACTION_DISPATCH, SPAN_AGENT_CYCLE, SPAN_APPROVAL_RESOLVE,
    SPAN_MODEL_REQUEST,
};
