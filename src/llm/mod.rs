//! Model client contract.
//!
//! The agent treats the language model as an opaque text-in/text-out
//! function. Failures must distinguish throttling
//! ([`MailAgentError::RateLimited`], retried with backoff by the loop) from
//! everything else (surfaced immediately).

pub mod openai;

use async_trait::async_trait;

use crate::error::MailAgentError;

pub use openai::{OpenAiCompatClient, OpenAiCompatConfig};

/// Text completion backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Short identifier for logs (model name or provider id).
    fn name(&self) -> &str;

    /// Generate a reply for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, MailAgentError>;
}
