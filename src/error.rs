//! Error types for the mailpilot crate.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via [`MailAgentError::code()`].
//! Codes are part of the public API contract and will not change.
//!
//! Only configuration, model-call and session-level failures surface as
//! [`MailAgentError`]. Failures inside individual actions are captured as
//! [`ActionError`](crate::actions::ActionError) outcomes and fed back to the
//! model instead.

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication with the model endpoint failed.
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// The model endpoint throttled the request.
    pub const RATE_LIMITED: &str = "RATE_LIMITED";

    /// The request to the model endpoint could not be completed.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// The model endpoint answered with an error or an unusable body.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";

    /// The action catalog was assembled incorrectly.
    pub const REGISTRY_INVALID: &str = "REGISTRY_INVALID";

    /// A cycle is already running for the session.
    pub const SESSION_BUSY: &str = "SESSION_BUSY";

    /// Request or operation timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";
}

/// Errors produced by the mailpilot crate.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum MailAgentError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    ConfigError(String),

    /// Authentication with the model endpoint failed (invalid/missing API key).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    AuthError(String),

    /// The model endpoint returned HTTP 429 or an equivalent throttle signal.
    #[error("[{}] {}", error_codes::RATE_LIMITED, .0)]
    RateLimited(String),

    /// Network-level failure talking to the model endpoint.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestError(String),

    /// Provider-specific error not covered by other variants.
    #[error("[{}] {}", error_codes::PROVIDER_ERROR, .0)]
    ProviderError(String),

    /// Duplicate or conflicting action registration.
    #[error("[{}] {}", error_codes::REGISTRY_INVALID, .0)]
    RegistryError(String),

    /// The session is still processing a previous message.
    #[error("[{}] {}", error_codes::SESSION_BUSY, .0)]
    SessionBusy(String),

    /// Request or operation timed out.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    TimeoutError(String),
}

impl MailAgentError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => error_codes::CONFIG_INVALID,
            Self::AuthError(_) => error_codes::AUTH_FAILED,
            Self::RateLimited(_) => error_codes::RATE_LIMITED,
            Self::RequestError(_) => error_codes::REQUEST_FAILED,
            Self::ProviderError(_) => error_codes::PROVIDER_ERROR,
            Self::RegistryError(_) => error_codes::REGISTRY_INVALID,
            Self::SessionBusy(_) => error_codes::SESSION_BUSY,
            Self::TimeoutError(_) => error_codes::TIMEOUT_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigError(m)
            | Self::AuthError(m)
            | Self::RateLimited(m)
            | Self::RequestError(m)
            | Self::ProviderError(m)
            | Self::RegistryError(m)
            | Self::SessionBusy(m)
            | Self::TimeoutError(m) => m,
        }
    }

    /// Returns true if this error is a throttle signal from the model endpoint.
    ///
    /// Only rate-limit failures are retried by the agent loop; everything
    /// else is surfaced to the user on the first occurrence.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Returns true if this error represents a transient failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::RequestError(_) | Self::TimeoutError(_) => true,
            Self::ConfigError(_)
            | Self::AuthError(_)
            | Self::ProviderError(_)
            | Self::RegistryError(_)
            | Self::SessionBusy(_) => false,
        }
    }
}

/// Convenience alias for mailpilot results.
pub type Result<T> = std::result::Result<T, MailAgentError>;
