//! Language model clients.
//!
//! `LlmClient::complete` turns the conversation plus the tool projections into exactly one
//! assistant message. Providers differ only in wire format:
//! - `openai` and `ollama` speak `/chat/completions` function calling
//! - `anthropic` speaks `/messages` with `tool_use` and `tool_result` blocks

pub mod anthropic;
pub mod openai;
pub mod retry;
pub mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netscout_core::config::{AppConfig, LlmProvider};
use netscout_core::{Message, ToolDefinition};
use thiserror::Error;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiCompatibleClient;
pub use retry::RetryPolicy;
pub use scripted::ScriptedLlm;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
    #[error("llm configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Auth(_) | Self::Malformed(_) | Self::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Malformed(error.to_string());
        }
        Self::Network(error.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns one assistant message answering `conversation`.
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, LlmError>;
}

#[async_trait]
impl<T> LlmClient for Arc<T>
where
    T: LlmClient + ?Sized,
{
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, LlmError> {
        (**self).complete(conversation, tools).await
    }
}

/// Builds the client for the configured provider.
pub fn client_from_config(config: &AppConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let client: Arc<dyn LlmClient> = match config.llm.provider {
        LlmProvider::OpenAi | LlmProvider::Ollama => {
            Arc::new(OpenAiCompatibleClient::from_config(&config.llm, config.llm_base_url())?)
        }
        LlmProvider::Anthropic => {
            Arc::new(AnthropicClient::from_config(&config.llm, config.llm_base_url())?)
        }
    };
    Ok(client)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|error| LlmError::Configuration(error.to_string()))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

pub(crate) fn status_error(status: u16, body: &str) -> LlmError {
    let message: String = body.trim().chars().take(300).collect();
    match status {
        401 | 403 => LlmError::Auth(message),
        429 => LlmError::RateLimited(message),
        _ => LlmError::Api { status, message },
    }
}
