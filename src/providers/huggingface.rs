//! HuggingFace Inference API adapter.
//!
//! The inference API takes a single flattened prompt instead of a message
//! list, and does not report token usage, so counts are estimated from
//! character lengths.

use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::{
    classify_status, classify_transport, estimate_tokens, ChatMessage, LlmProvider, ProviderError,
    ProviderRequest, ProviderResponse, Role,
};

const HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";
const HUGGINGFACE_DEFAULT_MODEL: &str = "llama-3";

/// Short model aliases mapped to full hub paths.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("llama-3", "meta-llama/Meta-Llama-3-8B-Instruct"),
    ("mixtral", "mistralai/Mixtral-8x7B-Instruct-v0.1"),
    ("qwen", "Qwen/Qwen2-7B-Instruct"),
];

/// HuggingFace provider adapter.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl HuggingFaceProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: HUGGINGFACE_BASE_URL.to_string(),
        }
    }

    fn model_path(model: &str) -> &str {
        let lower = model.to_lowercase();
        MODEL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, path)| *path)
            .unwrap_or(model)
    }
}

/// Flatten chat messages into the inference-API prompt format, ending with
/// an `Assistant:` cue for the completion.
pub(crate) fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut lines = Vec::with_capacity(messages.len() + 1);
    for message in messages {
        let prefix = match message.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        lines.push(format!("{}: {}", prefix, message.content));
    }
    let mut prompt = lines.join("\n");
    prompt.push_str("\nAssistant:");
    prompt
}

/// Pull the generated text out of the inference API's response, which is an
/// array of `{generated_text}` for most text-generation models and a bare
/// object for some others.
pub(crate) fn extract_generated_text(body: &Value) -> Option<String> {
    match body {
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("generated_text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Object(map) => map
            .get("generated_text")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Some models echo the prompt before the completion; strip it if present.
pub(crate) fn strip_prompt(content: &str, prompt: &str) -> String {
    if let Some(rest) = content.strip_prefix(prompt) {
        rest.trim().to_string()
    } else {
        content.trim().to_string()
    }
}

#[async_trait::async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn default_model(&self) -> &str {
        HUGGINGFACE_DEFAULT_MODEL
    }

    async fn invoke(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<ProviderResponse, ProviderError> {
        let provider = self.name();
        let api_key = self.api_key.as_deref().ok_or_else(|| ProviderError::Upstream {
            provider,
            message: "API key not configured".to_string(),
        })?;

        let model = request
            .model_override
            .as_deref()
            .unwrap_or(HUGGINGFACE_DEFAULT_MODEL);
        let model_path = Self::model_path(model);
        let prompt = flatten_messages(&request.messages);

        let mut parameters = json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            parameters["max_new_tokens"] = json!(max_tokens);
        }
        let payload = json!({ "inputs": prompt, "parameters": parameters });

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, model_path))
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport(provider, timeout, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            // The inference API returns 503 while a model is cold-loading.
            return Err(ProviderError::Upstream {
                provider,
                message: "model is loading or unavailable".to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(provider, status, &text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| classify_transport(provider, timeout, e))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let generated = extract_generated_text(&body).ok_or_else(|| ProviderError::Upstream {
            provider,
            message: "response contained no generated_text".to_string(),
        })?;
        let content = strip_prompt(&generated, &prompt);

        let hex = uuid::Uuid::new_v4().simple().to_string();
        Ok(ProviderResponse {
            id: format!("hf-{}", &hex[..12]),
            model: model.to_string(),
            content: content.clone(),
            finish_reason: Some("stop".to_string()),
            tokens_in: estimate_tokens(&prompt),
            tokens_out: estimate_tokens(&content),
            tokens_estimated: true,
            latency_ms,
        })
    }
}
