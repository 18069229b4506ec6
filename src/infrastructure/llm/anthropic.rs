use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::{classify_http_failure, HttpClientTrait};
use crate::domain::experiment::ModelConfig;
use crate::domain::llm::{Completion, LlmProvider, ProviderError, TokenUsage};
use crate::domain::metrics::{estimate_tokens, sanitize_chars_per_token, DEFAULT_CHARS_PER_TOKEN};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const PROVIDER: &str = "anthropic";

/// Anthropic messages API provider
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    chars_per_token: f64,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            api_key: api_key.into(),
            base_url,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Characters-per-token ratio for replies that carry no usage
    pub fn with_chars_per_token(mut self, chars_per_token: f64) -> Self {
        self.chars_per_token = sanitize_chars_per_token(chars_per_token);
        self
    }

    fn estimated_usage(&self, text: &str) -> TokenUsage {
        TokenUsage::estimated(estimate_tokens(
            text.chars().count() as u64,
            self.chars_per_token,
        ))
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    /// The messages API has no frequency/presence penalties; they are not sent
    fn build_request(&self, prompt: &str, config: &ModelConfig) -> serde_json::Value {
        serde_json::json!({
            "model": config.model_name,
            "max_tokens": config.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": config.temperature,
            "top_p": config.top_p,
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Completion, ProviderError> {
        let response: AnthropicResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::malformed_response(PROVIDER, e.to_string()))?;

        let texts: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if texts.is_empty() {
            return Err(ProviderError::malformed_response(
                PROVIDER,
                "No text content in response",
            ));
        }

        let text = texts.join("");
        let token_usage = match response.usage {
            Some(usage) => TokenUsage::from_counts(
                "input_tokens",
                usage.input_tokens,
                "output_tokens",
                usage.output_tokens,
            ),
            None => self.estimated_usage(&text),
        };

        Ok(Completion::new(text, token_usage))
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AnthropicProvider<C> {
    async fn complete(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> Result<Completion, ProviderError> {
        let url = self.messages_url();
        let body = self.build_request(prompt, config);
        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| classify_http_failure(PROVIDER, e))?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// Anthropic API types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Provider;
    use crate::domain::llm::ProviderErrorKind;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn config() -> ModelConfig {
        ModelConfig::new(Provider::Anthropic, "claude-3-sonnet").with_max_tokens(200)
    }

    #[tokio::test]
    async fn test_anthropic_complete() {
        let mock_response = serde_json::json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-sonnet",
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": " there!"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = AnthropicProvider::new(client, "sk-ant-test");

        let completion = provider.complete("Say hello", &config()).await.unwrap();

        assert_eq!(completion.text, "Hello there!");
        assert_eq!(completion.token_usage.get("input_tokens"), Some(12));
        assert_eq!(completion.token_usage.get("output_tokens"), Some(4));
        assert_eq!(completion.token_usage.total(), Some(16));
    }

    #[tokio::test]
    async fn test_anthropic_request_shape() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"content": [{"type": "text", "text": "ok"}]}),
        );
        let provider = AnthropicProvider::new(client, "sk-ant-test");

        provider.complete("Hi", &config()).await.unwrap();

        let requests = provider.client.requests();
        let body = &requests[0].1;
        assert_eq!(body["model"], "claude-3-sonnet");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["messages"][0]["content"], "Hi");
        assert!(body.get("frequency_penalty").is_none());
        assert_eq!(
            provider.client.header("x-api-key").as_deref(),
            Some("sk-ant-test")
        );
        assert_eq!(
            provider.client.header("anthropic-version").as_deref(),
            Some(ANTHROPIC_VERSION)
        );
    }

    #[tokio::test]
    async fn test_anthropic_missing_usage_is_estimated() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"content": [
                {"type": "text", "text": "Bonjour"},
                {"type": "text", "text": " le monde"}
            ]}),
        );
        let provider = AnthropicProvider::new(client, "sk-ant-test");

        let completion = provider.complete("Hi", &config()).await.unwrap();

        assert_eq!(completion.text, "Bonjour le monde");
        // 16 chars / 4
        assert_eq!(completion.token_usage.total(), Some(4));
        assert!(completion.token_usage.is_estimated());
    }

    #[tokio::test]
    async fn test_anthropic_credit_error_is_quota() {
        let client = MockHttpClient::new().with_status(
            TEST_URL,
            400,
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"Your credit balance is too low"}}"#,
        );
        let provider = AnthropicProvider::new(client, "sk-ant-test");

        let error = provider.complete("Hi", &config()).await.unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::QuotaExceeded);
    }

    #[tokio::test]
    async fn test_anthropic_overloaded_is_transient() {
        let client = MockHttpClient::new().with_status(TEST_URL, 529, "overloaded_error");
        let provider = AnthropicProvider::new(client, "sk-ant-test");

        let error = provider.complete("Hi", &config()).await.unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::TransientNetworkError);
        assert!(!error.triggers_demo_fallback());
    }

    #[tokio::test]
    async fn test_anthropic_no_text_is_malformed() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({"content": [{"type": "tool_use"}]}));
        let provider = AnthropicProvider::new(client, "sk-ant-test");

        let error = provider.complete("Hi", &config()).await.unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert!(error.message.starts_with("malformed response"));
    }
}
