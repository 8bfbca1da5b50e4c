//! Provider adapters: a uniform invocation contract over the upstream LLM
//! HTTP APIs.
//!
//! Each adapter translates the internal request into the provider's wire
//! format, performs a single POST with the configured deadline, and
//! normalizes the response. Adapters never retry; retry and fallback policy
//! belongs to [`crate::services::fallback`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod deepseek;
pub mod huggingface;
pub mod openai;

pub use deepseek::DeepSeekProvider;
pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAiProvider;

/// The providers the gateway can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    HuggingFace,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::HuggingFace => "huggingface",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::HuggingFace => "HuggingFace",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The internal request handed to an adapter.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ChatMessage>,
    pub model_override: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

/// Normalized provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Upstream completion id (or a synthesized one when absent)
    pub id: String,
    /// Model that actually served the request
    pub model: String,
    /// Assistant message content
    pub content: String,
    pub finish_reason: Option<String>,
    pub tokens_in: u32,
    pub tokens_out: u32,
    /// True when token counts were estimated rather than reported upstream
    pub tokens_estimated: bool,
    /// Wall-clock latency of the adapter invocation
    pub latency_ms: u64,
}

/// Classified provider failures. These are the only errors the fallback
/// chain advances on.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request timed out after {timeout_secs}s")]
    Timeout {
        provider: &'static str,
        timeout_secs: u64,
    },

    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Timeout { provider, .. }
            | ProviderError::RateLimited { provider }
            | ProviderError::Upstream { provider, .. } => provider,
        }
    }

    /// Stable label value for `llm_gateway_errors_total{error_type}`.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Upstream { .. } => "upstream",
        }
    }
}

/// Uniform invocation contract over one upstream LLM API.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable provider name used in metrics, logs, and cost rows.
    fn name(&self) -> &'static str;

    /// Model used when the request carries no override.
    fn default_model(&self) -> &str;

    /// Translate, POST once with `timeout`, and normalize the response.
    async fn invoke(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// The adapter table: one constructed adapter per provider, dispatched
/// by [`ProviderKind`].
pub struct ProviderTable {
    openai: Arc<dyn LlmProvider>,
    deepseek: Arc<dyn LlmProvider>,
    huggingface: Arc<dyn LlmProvider>,
}

impl ProviderTable {
    pub fn new(
        openai: Arc<dyn LlmProvider>,
        deepseek: Arc<dyn LlmProvider>,
        huggingface: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            openai,
            deepseek,
            huggingface,
        }
    }

    /// Build the three adapters over one shared HTTP client.
    pub fn from_settings(client: &reqwest::Client, settings: &crate::core::config::Settings) -> Self {
        Self::new(
            Arc::new(OpenAiProvider::new(
                client.clone(),
                settings.openai_api_key.clone(),
            )),
            Arc::new(DeepSeekProvider::new(
                client.clone(),
                settings.deepseek_api_key.clone(),
            )),
            Arc::new(HuggingFaceProvider::new(
                client.clone(),
                settings.huggingface_api_key.clone(),
            )),
        )
    }

    pub fn get(&self, kind: ProviderKind) -> Arc<dyn LlmProvider> {
        match kind {
            ProviderKind::OpenAi => self.openai.clone(),
            ProviderKind::DeepSeek => self.deepseek.clone(),
            ProviderKind::HuggingFace => self.huggingface.clone(),
        }
    }

    /// Resolve a routed chain into adapters, order preserved.
    pub fn chain(&self, kinds: &[ProviderKind]) -> Vec<Arc<dyn LlmProvider>> {
        kinds.iter().map(|kind| self.get(*kind)).collect()
    }
}

/// Map a transport-level failure onto the taxonomy.
pub(crate) fn classify_transport(
    provider: &'static str,
    timeout: Duration,
    err: reqwest::Error,
) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            provider,
            timeout_secs: timeout.as_secs(),
        }
    } else {
        ProviderError::Upstream {
            provider,
            message: err.to_string(),
        }
    }
}

/// Rough token estimate for providers that omit usage counts: one token per
/// four characters, rounded down. A heuristic, not a contract.
pub(crate) fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

/// Map a non-success HTTP status onto the taxonomy.
pub(crate) fn classify_status(
    provider: &'static str,
    status: reqwest::StatusCode,
    body: &str,
) -> ProviderError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited { provider }
    } else {
        // Truncate upstream bodies so error messages stay log-sized.
        let snippet: String = body.chars().take(200).collect();
        ProviderError::Upstream {
            provider,
            message: format!("{} - {}", status.as_u16(), snippet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::OpenAi.as_str(), "openai");
        assert_eq!(ProviderKind::DeepSeek.as_str(), "deepseek");
        assert_eq!(ProviderKind::HuggingFace.as_str(), "huggingface");
        assert_eq!(ProviderKind::HuggingFace.display_name(), "HuggingFace");
    }

    #[test]
    fn test_role_serde_lowercase() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        let out = serde_json::to_string(&msg).unwrap();
        assert!(out.contains(r#""role":"user""#));
    }

    #[test]
    fn test_classify_status_429_is_rate_limited() {
        let err = classify_status("openai", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, ProviderError::RateLimited { provider: "openai" }));
        assert_eq!(err.error_type(), "rate_limited");
    }

    #[test]
    fn test_classify_status_5xx_is_upstream() {
        let err = classify_status(
            "deepseek",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        match &err {
            ProviderError::Upstream { provider, message } => {
                assert_eq!(*provider, "deepseek");
                assert!(message.starts_with("500"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
        assert_eq!(err.error_type(), "upstream");
    }

    #[test]
    fn test_classify_status_truncates_body() {
        let long_body = "x".repeat(5000);
        let err = classify_status("openai", reqwest::StatusCode::BAD_GATEWAY, &long_body);
        match err {
            ProviderError::Upstream { message, .. } => assert!(message.len() < 300),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_estimate_tokens_floors() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(103)), 25);
    }

    #[test]
    fn test_error_type_labels() {
        let timeout = ProviderError::Timeout {
            provider: "openai",
            timeout_secs: 30,
        };
        assert_eq!(timeout.error_type(), "timeout");
        assert_eq!(timeout.provider(), "openai");
    }
}
