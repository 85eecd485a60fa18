//! Agent loop for the email and calendar assistant.
//!
//! Drives the cycle: build prompt -> call model -> parse directives ->
//! dispatch non-gated actions or park gated ones for approval -> feed
//! results back -> repeat until the model answers without directives.
//!
//! # Submodules
//!
//! - [`types`] — Loop configuration, retry policy and reply types
//! - [`prompt`] — Deterministic prompt assembly
//! - [`loop_engine`] — The [`MailAgent`] orchestrator
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mailpilot::actions::builtin_registry;
//! use mailpilot::agent::{AgentConfig, MailAgent};
//! use mailpilot::llm::{OpenAiCompatClient, OpenAiCompatConfig};
//! use mailpilot::mailbox::InMemoryMailbox;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = OpenAiCompatClient::new(OpenAiCompatConfig {
//!     base_url: "http://localhost:11434".into(),
//!     model: "llama3".into(),
//!     api_key: None,
//!     temperature: None,
//!     request_timeout: std::time::Duration::from_secs(60),
//! })?;
//! let registry = builtin_registry(Arc::new(InMemoryMailbox::sample()), 10)?;
//! let agent = MailAgent::new(AgentConfig::default(), Arc::new(model), Arc::new(registry));
//!
//! let reply = agent.handle_message("What's unread?").await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

pub mod loop_engine;
pub mod prompt;
pub mod types;


pub use loop_engine::{ITERATION_LIMIT_NOTICE, MailAgent};
pub use prompt::{DEFAULT_PREAMBLE, PromptContext, build_prompt};
pub use types::{AgentConfig, AgentReply, RetryPolicy, StopReason};
