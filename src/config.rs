//! Configuration types for the mail assistant.
//!
//! Loaded from TOML. Every section defaults, so a partial file (or no file
//! at all) is valid. Secrets never live in the file: only the names of the
//! environment variables that hold them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent::AgentConfig;
use crate::error::{MailAgentError, Result};
use crate::llm::OpenAiCompatConfig;
use crate::mailbox::{DEFAULT_GRAPH_BASE_URL, token_from_env};
use crate::observability::RedactedString;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Language model endpoint.
    pub model: ModelSettings,
    /// Mailbox provider.
    pub mailbox: MailboxSettings,
    /// Agent loop limits.
    pub agent: AgentConfig,
    /// Log filtering.
    pub logging: LoggingSettings,
}

/// OpenAI-compatible model endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// API root without the `/v1/...` suffix.
    pub base_url: String,
    /// Model name to request.
    pub model: String,
    /// Environment variable holding the API key. Empty for keyless local servers.
    pub api_key_env: String,
    /// Sampling temperature. Unset leaves the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            // Ollama default endpoint.
            base_url: "http://localhost:11434".to_owned(),
            model: "llama3.1".to_owned(),
            api_key_env: "MAILPILOT_API_KEY".to_owned(),
            temperature: None,
            request_timeout_secs: 120,
        }
    }
}

/// Mailbox provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxSettings {
    /// REST API root.
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    /// Default cap for search and unread listings.
    pub max_search_results: usize,
    /// Task list used by task actions. Empty selects the provider default.
    pub task_list: String,
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_owned(),
            token_env: "MAILPILOT_MAILBOX_TOKEN".to_owned(),
            max_search_results: 10,
            task_list: String::new(),
        }
    }
}

/// Log filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` overrides it.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "mailpilot=info".to_owned(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MailAgentError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            MailAgentError::ConfigError(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let io_err =
            |e: std::io::Error| MailAgentError::ConfigError(format!("{}: {e}", path.display()));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| MailAgentError::ConfigError(e.to_string()))?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/mailpilot/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("mailpilot")
            .join("config.toml")
    }

    /// Reject settings the agent cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::ConfigError`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(MailAgentError::ConfigError(msg.to_owned()));
        let agent = &self.agent;
        if agent.max_iterations == 0 {
            return invalid("agent.max_iterations must be at least 1");
        }
        if agent.memory_capacity == 0 {
            return invalid("agent.memory_capacity must be at least 1");
        }
        if agent.recent_window == 0 {
            return invalid("agent.recent_window must be at least 1");
        }
        if agent.recent_window > agent.memory_capacity {
            return invalid("agent.recent_window cannot exceed agent.memory_capacity");
        }
        if agent.action_timeout_secs == 0 {
            return invalid("agent.action_timeout_secs must be at least 1");
        }
        if agent.max_tool_output_bytes == 0 {
            return invalid("agent.max_tool_output_bytes must be at least 1");
        }
        if agent.retry.max_attempts == 0 {
            return invalid("agent.retry.max_attempts must be at least 1");
        }
        if self.mailbox.max_search_results == 0 {
            return invalid("mailbox.max_search_results must be at least 1");
        }
        if self.model.base_url.trim().is_empty() {
            return invalid("model.base_url must be set");
        }
        if self.model.model.trim().is_empty() {
            return invalid("model.model must be set");
        }
        if self.model.request_timeout_secs == 0 {
            return invalid("model.request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// API key from the configured environment variable, if any.
    pub fn resolve_api_key(&self) -> Option<RedactedString> {
        let var = self.model.api_key_env.trim();
        if var.is_empty() {
            return None;
        }
        token_from_env(var)
    }

    /// Mailbox bearer token from the configured environment variable, if any.
    pub fn resolve_mailbox_token(&self) -> Option<RedactedString> {
        token_from_env(self.mailbox.token_env.trim())
    }

    /// Settings for [`OpenAiCompatClient`](crate::llm::OpenAiCompatClient).
    pub fn model_client_config(&self) -> OpenAiCompatConfig {
        OpenAiCompatConfig {
            base_url: self.model.base_url.clone(),
            model: self.model.model.clone(),
            api_key: self.resolve_api_key(),
            temperature: self.model.temperature,
            request_timeout: Duration::from_secs(self.model.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AssistantConfig::default();
        config.validate().unwrap();
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.agent.memory_capacity, 50);
        assert_eq!(config.agent.recent_window, 10);
        assert_eq!(config.logging.filter, "mailpilot=info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AssistantConfig = toml::from_str(
            r#"
            [model]
            model = "gpt-4o-mini"

            [agent]
            max_iterations = 4

            [agent.retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.base_url, "http://localhost:11434");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.memory_capacity, 50);
        assert_eq!(config.agent.retry.max_attempts, 5);
        assert_eq!(config.agent.retry.base_delay_ms, 1000);
        assert_eq!(config.mailbox.max_search_results, 10);
    }

    #[test]
    fn validate_rejects_zero_caps() {
        let mut config = AssistantConfig::default();
        config.agent.max_iterations = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.message().contains("max_iterations"));

        let mut config = AssistantConfig::default();
        config.agent.memory_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.mailbox.max_search_results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_window_larger_than_memory() {
        let mut config = AssistantConfig::default();
        config.agent.memory_capacity = 5;
        config.agent.recent_window = 6;
        let err = config.validate().unwrap_err();
        assert!(err.message().contains("recent_window"));
    }

    #[test]
    fn blank_api_key_env_resolves_to_none() {
        let mut config = AssistantConfig::default();
        config.model.api_key_env = "  ".into();
        assert!(config.resolve_api_key().is_none());
        assert!(config.model_client_config().api_key.is_none());
    }

    #[test]
    fn serialized_config_holds_no_secrets() {
        let config = AssistantConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("api_key_env = \"MAILPILOT_API_KEY\""));
        assert!(text.contains("token_env = \"MAILPILOT_MAILBOX_TOKEN\""));
        assert!(!text.contains("Bearer"));
    }

    #[test]
    fn default_path_ends_with_crate_dir() {
        let path = AssistantConfig::default_config_path();
        assert!(path.ends_with("mailpilot/config.toml"));
    }
}
