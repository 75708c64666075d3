use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4111";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Target agent on the remote service.
    pub agent_id: String,
    /// Logical owner of the conversation; scopes thread listing.
    pub resource_id: String,
    /// Conversation identity on the remote service.
    pub thread_id: String,
    pub base_url: String,
    #[serde(default)]
    pub options: StreamOptions,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl SessionConfig {
    pub fn new(
        agent_id: impl Into<String>,
        resource_id: impl Into<String>,
        thread_id: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            resource_id: resource_id.into(),
            thread_id: thread_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            options: StreamOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_id.trim().is_empty() {
            return Err(ConfigError::MissingField("agentId"));
        }
        if self.resource_id.trim().is_empty() {
            return Err(ConfigError::MissingField("resourceId"));
        }
        if self.thread_id.trim().is_empty() {
            return Err(ConfigError::MissingField("threadId"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }
}

/// Options forwarded verbatim to the service on every stream request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

/// Retry policy for opening a stream or a thread request. Connect-class
/// failures retry with doubling backoff; mid-stream read failures do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff_ms: 250,
            max_backoff_ms: 4_000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let doubled = self.backoff_ms.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(doubled.min(self.max_backoff_ms))
    }
}
