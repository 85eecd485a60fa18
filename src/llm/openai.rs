//! OpenAI-compatible chat-completions client.
//!
//! Sends the whole prompt as a single user message to
//! `{base_url}/v1/chat/completions` (non-streaming) and returns the first
//! choice's content. Works with any server exposing that endpoint
//! (OpenAI, vLLM, Ollama, LM Studio, …).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::ModelClient;
use crate::error::MailAgentError;
use crate::observability::{RedactedString, redact_secrets};

/// Connection settings for [`OpenAiCompatClient`].
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// API root without the `/v1/...` suffix.
    pub base_url: String,
    pub model: String,
    /// Optional for local servers that do not check keys.
    pub api_key: Option<RedactedString>,
    pub temperature: Option<f32>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Chat-completions client.
pub struct OpenAiCompatClient {
    config: OpenAiCompatConfig,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::ConfigError`] if the HTTP client cannot be built.
    pub fn new(mut config: OpenAiCompatConfig) -> Result<Self, MailAgentError> {
        config.base_url = config.base_url.trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MailAgentError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> MailAgentError {
        let message = redact_secrets(&extract_error_message(body));
        match status.as_u16() {
            401 | 403 => MailAgentError::AuthError(format!("model authentication failed: {message}")),
            429 => MailAgentError::RateLimited(format!("model rate limited: {message}")),
            code => MailAgentError::ProviderError(format!("model HTTP {code}: {message}")),
        }
    }
}

/// Extract an error message from an OpenAI-style error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, MailAgentError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });
        if let Some(t) = self.config.temperature {
            body["temperature"] = json!(t);
        }

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.as_str()));
        }

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "model request");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MailAgentError::TimeoutError(format!("model request timed out: {e}"))
            } else {
                MailAgentError::RequestError(format!("model request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            MailAgentError::ProviderError(format!("unreadable completion body: {e}"))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MailAgentError::ProviderError("completion had no content".to_owned()))
    }
}
