//! API request and response models with body validation.

use serde::{Deserialize, Serialize};

use crate::core::error::GatewayError;
use crate::providers::{ChatMessage, ProviderRequest, Role};
use crate::routing::{BudgetLevel, RouteHints, TaskKind};

/// One message in a chat request or response.
///
/// The role arrives as a free string and is validated into
/// [`Role`]; rejecting it here keeps the error a 400 rather than a serde
/// rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub role: String,
    pub content: String,
}

/// `POST /v1/chat/completions` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    /// Task type hint: summarization, reasoning, general
    pub task: Option<String>,
    /// Budget level hint: low, medium, high
    pub budget: Option<String>,
    #[serde(default)]
    pub latency_sensitive: bool,
    pub messages: Vec<MessageBody>,
    /// Model override (optional)
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f64 {
    0.7
}

impl ChatCompletionRequest {
    /// Validate the body and split it into routing hints and the provider
    /// request.
    ///
    /// Unrecognized task/budget strings are treated as unset so they fall
    /// through the routing rules; malformed messages and out-of-range
    /// sampling parameters are rejected.
    pub fn validate(self) -> Result<(RouteHints, ProviderRequest), GatewayError> {
        if self.messages.is_empty() {
            return Err(GatewayError::Validation(
                "messages must not be empty".to_string(),
            ));
        }

        let mut messages = Vec::with_capacity(self.messages.len());
        for (index, message) in self.messages.into_iter().enumerate() {
            let role = match message.role.as_str() {
                "system" => Role::System,
                "user" => Role::User,
                "assistant" => Role::Assistant,
                other => {
                    return Err(GatewayError::Validation(format!(
                        "messages[{index}].role must be one of system, user, assistant (got {other:?})"
                    )))
                }
            };
            if message.content.is_empty() {
                return Err(GatewayError::Validation(format!(
                    "messages[{index}].content must not be empty"
                )));
            }
            messages.push(ChatMessage {
                role,
                content: message.content,
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GatewayError::Validation(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens < 1 {
                return Err(GatewayError::Validation(
                    "max_tokens must be at least 1".to_string(),
                ));
            }
        }

        let hints = RouteHints {
            task: self.task.as_deref().and_then(TaskKind::parse),
            budget: self.budget.as_deref().and_then(BudgetLevel::parse),
            latency_sensitive: self.latency_sensitive,
        };

        let request = ProviderRequest {
            messages,
            model_override: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        Ok((hints, request))
    }
}

/// One completion choice.
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: MessageBody,
    pub finish_reason: Option<String>,
}

/// Token usage block.
#[derive(Debug, Clone, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// `POST /v1/chat/completions` response body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
    pub provider: String,
    pub cost_usd: f64,
}

/// `GET /v1/routing/preview` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingPreviewParams {
    pub task: Option<String>,
    pub budget: Option<String>,
    #[serde(default)]
    pub latency_sensitive: bool,
}

/// `GET /v1/routing/preview` response body.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingPreviewResponse {
    pub selected_provider: String,
    pub provider_name: String,
    pub reason: String,
    pub fallback_chain: Vec<String>,
}
