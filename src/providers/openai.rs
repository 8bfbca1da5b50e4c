//! OpenAI chat-completions adapter.
//!
//! The wire types and invocation path here are shared with the DeepSeek
//! adapter, which speaks the same schema at a different base URL.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{
    classify_status, classify_transport, estimate_tokens, ChatMessage, LlmProvider, ProviderError,
    ProviderRequest, ProviderResponse,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionsBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionsReply {
    pub id: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ReplyChoice>,
    pub usage: Option<ReplyUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyChoice {
    pub message: ReplyMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyMessage {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Normalize a parsed reply into the internal contract.
///
/// When `usage` is missing, token counts are estimated from character
/// lengths and the response is flagged accordingly.
pub(crate) fn normalize_reply(
    provider: &'static str,
    reply: ChatCompletionsReply,
    request: &ProviderRequest,
    requested_model: &str,
    latency_ms: u64,
) -> Result<ProviderResponse, ProviderError> {
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Upstream {
            provider,
            message: "response contained no choices".to_string(),
        })?;

    let (tokens_in, tokens_out, tokens_estimated) = match reply.usage {
        Some(usage) => (usage.prompt_tokens, usage.completion_tokens, false),
        None => {
            let prompt_chars: String = request
                .messages
                .iter()
                .map(|m| m.content.as_str())
                .collect();
            (
                estimate_tokens(&prompt_chars),
                estimate_tokens(&choice.message.content),
                true,
            )
        }
    };

    Ok(ProviderResponse {
        id: reply.id.unwrap_or_else(generate_completion_id),
        model: reply.model.unwrap_or_else(|| requested_model.to_string()),
        content: choice.message.content,
        finish_reason: choice.finish_reason,
        tokens_in,
        tokens_out,
        tokens_estimated,
        latency_ms,
    })
}

pub(crate) fn generate_completion_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..12])
}

/// Single POST against an OpenAI-schema endpoint.
pub(crate) async fn invoke_chat_completions(
    client: &reqwest::Client,
    provider: &'static str,
    base_url: &str,
    api_key: Option<&str>,
    default_model: &str,
    request: &ProviderRequest,
    timeout: Duration,
) -> Result<ProviderResponse, ProviderError> {
    let api_key = api_key.ok_or_else(|| ProviderError::Upstream {
        provider,
        message: "API key not configured".to_string(),
    })?;

    let model = request.model_override.as_deref().unwrap_or(default_model);
    let body = ChatCompletionsBody {
        model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let started = Instant::now();
    let response = client
        .post(format!("{base_url}/chat/completions"))
        .bearer_auth(api_key)
        .timeout(timeout)
        .json(&body)
        .send()
        .await
        .map_err(|e| classify_transport(provider, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(classify_status(provider, status, &text));
    }

    let reply: ChatCompletionsReply = response
        .json()
        .await
        .map_err(|e| classify_transport(provider, timeout, e))?;
    let latency_ms = started.elapsed().as_millis() as u64;

    normalize_reply(provider, reply, request, model, latency_ms)
}

/// OpenAI provider adapter.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &str {
        OPENAI_DEFAULT_MODEL
    }

    async fn invoke(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<ProviderResponse, ProviderError> {
        invoke_chat_completions(
            &self.client,
            self.name(),
            &self.base_url,
            self.api_key.as_deref(),
            self.default_model(),
            request,
            timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Role;

    fn sample_request() -> ProviderRequest {
        ProviderRequest {
            messages: vec![ChatMessage {
                role: Role::User,
                content: "Summarize: X".to_string(),
            }],
            model_override: None,
            temperature: 0.7,
            max_tokens: Some(128),
        }
    }

    #[test]
    fn test_body_serialization_includes_model_and_messages() {
        let request = sample_request();
        let body = ChatCompletionsBody {
            model: "gpt-3.5-turbo",
            messages: &request.messages,
            temperature: 0.7,
            max_tokens: Some(128),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Summarize: X");
        assert_eq!(json["max_tokens"], 128);
    }

    #[test]
    fn test_body_serialization_omits_absent_max_tokens() {
        let request = sample_request();
        let body = ChatCompletionsBody {
            model: "gpt-4",
            messages: &request.messages,
            temperature: 1.0,
            max_tokens: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_normalize_reply_with_usage() {
        let reply: ChatCompletionsReply = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-abc123",
            "model": "gpt-3.5-turbo-0125",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Summary of X"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .unwrap();

        let request = sample_request();
        let normalized = normalize_reply("openai", reply, &request, "gpt-3.5-turbo", 42).unwrap();
        assert_eq!(normalized.id, "chatcmpl-abc123");
        assert_eq!(normalized.model, "gpt-3.5-turbo-0125");
        assert_eq!(normalized.content, "Summary of X");
        assert_eq!(normalized.finish_reason.as_deref(), Some("stop"));
        assert_eq!(normalized.tokens_in, 10);
        assert_eq!(normalized.tokens_out, 5);
        assert!(!normalized.tokens_estimated);
        assert_eq!(normalized.latency_ms, 42);
    }

    #[test]
    fn test_normalize_reply_estimates_when_usage_missing() {
        let reply: ChatCompletionsReply = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "12345678"}
            }]
        }))
        .unwrap();

        let request = sample_request();
        let normalized = normalize_reply("openai", reply, &request, "gpt-3.5-turbo", 7).unwrap();
        // "Summarize: X" is 12 chars -> 3 tokens; "12345678" is 8 -> 2.
        assert_eq!(normalized.tokens_in, 3);
        assert_eq!(normalized.tokens_out, 2);
        assert!(normalized.tokens_estimated);
        assert!(normalized.id.starts_with("chatcmpl-"));
        assert_eq!(normalized.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_normalize_reply_rejects_empty_choices() {
        let reply: ChatCompletionsReply =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        let request = sample_request();
        let err = normalize_reply("openai", reply, &request, "gpt-3.5-turbo", 1).unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_invoke_without_key_fails_fast() {
        let provider = OpenAiProvider::new(reqwest::Client::new(), None);
        let err = provider
            .invoke(&sample_request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            ProviderError::Upstream { message, .. } => {
                assert!(message.contains("not configured"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
