//! DeepSeek adapter.
//!
//! DeepSeek exposes the OpenAI chat-completions schema at its own base URL,
//! so this adapter reuses the OpenAI wire path with a different endpoint and
//! default model.

use std::time::Duration;

use super::openai::invoke_chat_completions;
use super::{LlmProvider, ProviderError, ProviderRequest, ProviderResponse};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

/// DeepSeek provider adapter.
pub struct DeepSeekProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl DeepSeekProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: DEEPSEEK_BASE_URL.to_string(),
        }
    }

}

#[async_trait::async_trait]
impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn default_model(&self) -> &str {
        DEEPSEEK_DEFAULT_MODEL
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
    use crate::providers::{ChatMessage, Role};

    #[test]
    fn test_name_and_default_model() {
        let provider = DeepSeekProvider::new(reqwest::Client::new(), None);
        assert_eq!(provider.name(), "deepseek");
        assert_eq!(provider.default_model(), "deepseek-chat");
    }

    #[tokio::test]
    async fn test_invoke_without_key_fails_fast() {
        let provider = DeepSeekProvider::new(reqwest::Client::new(), None);
        let request = ProviderRequest {
            messages: vec![ChatMessage {
                role: Role::User,
                content: "hello".to_string(),
            }],
            model_override: None,
            temperature: 0.7,
            max_tokens: None,
        };
        let err = provider
            .invoke(&request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.provider(), "deepseek");
        assert!(matches!(err, ProviderError::Upstream { .. }));
    }
}
