//! Mailpilot: an LLM-driven email and calendar assistant.
//!
//! A user message goes through one agent cycle:
//! Memory → Prompt → Model → Parser → (Approval Gate | Executor) → Memory
//!
//! # Architecture
//!
//! - **Action registry**: the catalog of mailbox actions, their parameter
//!   schemas and which ones need human approval
//! - **Response parser**: extracts `<action name="...">` directives from
//!   free-form model output
//! - **Approval gate**: parks sending, replying, forwarding, deleting and
//!   event creation until the user decides
//! - **Conversation memory**: bounded turn history plus the last search
//!   results and known contacts
//! - **Agent loop**: drives model calls and dispatches until the model
//!   answers without directives or the iteration cap is reached

pub mod actions;
pub mod agent;
pub mod approval;
pub mod config;
pub mod error;
pub mod llm;
pub mod mailbox;
pub mod observability;
pub mod parser;
pub mod session;

pub use actions::{ActionRegistry, builtin_registry};
pub use agent::{AgentConfig, AgentReply, MailAgent, StopReason};
pub use approval::{ApprovalGate, Decision, PendingApproval};
pub use config::AssistantConfig;
pub use error::{MailAgentError, Result};
pub use llm::ModelClient;
pub use mailbox::{MailboxClient, MailboxError};
