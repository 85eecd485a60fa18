//! Configuration and result types for the agent loop.
//!
//! Provides [`AgentConfig`] for controlling loop behaviour (iteration cap,
//! memory size, timeouts, retry policy) and [`AgentReply`] for the outcome
//! of one cycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actions::DEFAULT_MAX_OUTPUT_BYTES;
use crate::approval::PendingApproval;
use crate::session::DEFAULT_MEMORY_CAPACITY;

/// Default maximum model round-trips per cycle.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default number of recent turns included in each prompt.
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Default per-action execution timeout in seconds.
pub const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 30;

/// Default maximum model calls per iteration when throttled.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Default maximum delay for exponential backoff in milliseconds.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 8000;

/// Default backoff multiplier (2.0 for exponential backoff).
pub const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Backoff policy for rate-limited model calls.
///
/// Only [`MailAgentError::RateLimited`](crate::error::MailAgentError::RateLimited)
/// is retried; every other model failure ends the cycle at once.
///
/// # Examples
///
/// ```
/// use mailpilot::agent::types::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.base_delay_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total model calls allowed for one prompt, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth).
    pub max_delay_ms: u64,
    /// Backoff multiplier (2.0 for exponential backoff).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_RETRY_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Delay before retry number `retry` (1-based), with up to 10% jitter.
    ///
    /// Formula: min(base * multiplier^(retry-1), max_delay) + jitter
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::from_millis(0);
        }

        let base = self.base_delay_ms as f64;
        let max = self.max_delay_ms as f64;
        let exp = self
            .backoff_multiplier
            .powi(i32::try_from(retry - 1).unwrap_or(i32::MAX));
        let delay = (base * exp).min(max);

        let jitter = delay * (rand::random::<f64>() * 0.1);
        Duration::from_millis((delay + jitter) as u64)
    }
}

/// Agent loop settings (`[agent]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model round-trips per cycle before stopping with a notice.
    pub max_iterations: u32,
    /// Turns retained in conversation memory.
    pub memory_capacity: usize,
    /// Recent turns included in each prompt.
    pub recent_window: usize,
    /// Timeout for each action execution in seconds.
    pub action_timeout_secs: u64,
    /// Tool output beyond this many bytes is truncated before it enters memory.
    pub max_tool_output_bytes: usize,
    /// Replaces the built-in behaviour preamble when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    /// Backoff for rate-limited model calls.
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            recent_window: DEFAULT_RECENT_WINDOW,
            action_timeout_secs: DEFAULT_ACTION_TIMEOUT_SECS,
            max_tool_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            preamble: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl AgentConfig {
    /// Create a new agent config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    pub fn with_recent_window(mut self, window: usize) -> Self {
        self.recent_window = window;
        self
    }

    pub fn with_action_timeout_secs(mut self, secs: u64) -> Self {
        self.action_timeout_secs = secs;
        self
    }

    pub fn with_max_tool_output_bytes(mut self, bytes: usize) -> Self {
        self.max_tool_output_bytes = bytes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }
}

/// Why a cycle returned control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model replied without directives.
    Complete,
    /// A gated action is waiting for the user.
    ApprovalRequired,
    /// The iteration cap was hit; the reply carries a partial answer.
    IterationLimit,
    /// The model could not be reached; the session stays usable.
    ModelFailure,
    /// `resolve_approval` named an unknown or already-resolved id.
    ApprovalNotFound,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    /// Text to show the user.
    pub text: String,
    pub stop: StopReason,
    /// Model calls made during this cycle, retries included.
    pub model_calls: u32,
    /// Actions executed (successfully or not) during this cycle.
    pub actions_run: u32,
    /// Set when `stop` is [`StopReason::ApprovalRequired`].
    pub pending: Option<PendingApproval>,
}

impl AgentReply {
    pub fn needs_approval(&self) -> bool {
        self.stop == StopReason::ApprovalRequired
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.memory_capacity, 50);
        assert_eq!(config.recent_window, 10);
        assert_eq!(config.action_timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_delay_ms, 8000);
    }

    #[test]
    fn agent_config_builder() {
        let config = AgentConfig::new()
            .with_max_iterations(3)
            .with_memory_capacity(20)
            .with_recent_window(5)
            .with_action_timeout_secs(2)
            .with_preamble("Be brief.");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.memory_capacity, 20);
        assert_eq!(config.recent_window, 5);
        assert_eq!(config.action_timeout_secs, 2);
        assert_eq!(config.preamble.as_deref(), Some("Be brief."));
    }

    #[test]
    fn retry_delay_grows_and_is_capped() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_max_delay_ms(300)
            .with_backoff_multiplier(2.0);
        assert_eq!(policy.delay_for_retry(0), Duration::ZERO);

        let first = policy.delay_for_retry(1).as_millis();
        assert!((100..=110).contains(&first), "first retry {first}ms");

        let second = policy.delay_for_retry(2).as_millis();
        assert!((200..=220).contains(&second), "second retry {second}ms");

        let capped = policy.delay_for_retry(10).as_millis();
        assert!((300..=330).contains(&capped), "capped retry {capped}ms");
    }

    #[test]
    fn partial_retry_section_keeps_defaults() {
        let policy: RetryPolicy = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, DEFAULT_RETRY_BASE_DELAY_MS);
    }

    #[test]
    fn types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AgentConfig>();
        assert_send_sync::<AgentReply>();
        assert_send_sync::<RetryPolicy>();
    }
}
