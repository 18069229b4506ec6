use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::{classify_http_failure, HttpClientTrait};
use crate::domain::experiment::ModelConfig;
use crate::domain::llm::{Completion, LlmProvider, ProviderError, TokenUsage};
use crate::domain::metrics::{estimate_tokens, sanitize_chars_per_token, DEFAULT_CHARS_PER_TOKEN};

pub const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";

const PROVIDER: &str = "huggingface";

/// Hugging Face hosted inference provider (text generation task)
#[derive(Debug)]
pub struct HuggingFaceProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    chars_per_token: f64,
}

impl<C: HttpClientTrait> HuggingFaceProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_HUGGINGFACE_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Characters-per-token ratio for replies that carry no usage
    pub fn with_chars_per_token(mut self, chars_per_token: f64) -> Self {
        self.chars_per_token = sanitize_chars_per_token(chars_per_token);
        self
    }

    fn model_url(&self, model_name: &str) -> String {
        format!("{}/models/{}", self.base_url, model_name)
    }

    fn build_request(&self, prompt: &str, config: &ModelConfig) -> serde_json::Value {
        serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": config.max_tokens,
                "temperature": config.temperature,
                "top_p": config.top_p,
                "return_full_text": false,
            },
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    /// The inference API reports no usage; tokens are always estimated
    fn parse_response(&self, json: serde_json::Value) -> Result<Completion, ProviderError> {
        let response: HuggingFaceResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::malformed_response(PROVIDER, e.to_string()))?;

        let text = match response {
            HuggingFaceResponse::Many(generations) => generations
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .ok_or_else(|| {
                    ProviderError::malformed_response(PROVIDER, "No generations in response")
                })?,
            HuggingFaceResponse::One(generation) => generation.generated_text,
        };

        let token_usage = TokenUsage::estimated(estimate_tokens(
            text.chars().count() as u64,
            self.chars_per_token,
        ));

        Ok(Completion::new(text, token_usage))
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for HuggingFaceProvider<C> {
    async fn complete(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> Result<Completion, ProviderError> {
        let url = self.model_url(&config.model_name);
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

// Hugging Face API types

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HuggingFaceResponse {
    Many(Vec<Generation>),
    One(Generation),
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Provider;
    use crate::domain::llm::{ProviderErrorKind, ESTIMATED_TOKENS};
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api-inference.huggingface.co/models/gpt2";

    fn config() -> ModelConfig {
        ModelConfig::new(Provider::HuggingFace, "gpt2").with_max_tokens(64)
    }

    #[tokio::test]
    async fn test_huggingface_complete() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!([{"generated_text": "once upon a time"}]),
        );
        let provider = HuggingFaceProvider::new(client, "hf_test");

        let completion = provider.complete("Tell a story", &config()).await.unwrap();

        assert_eq!(completion.text, "once upon a time");
        // 16 chars / 4
        assert_eq!(completion.token_usage.total(), Some(4));
        assert_eq!(completion.token_usage.get(ESTIMATED_TOKENS), Some(4));
        assert!(completion.token_usage.is_estimated());

        let requests = provider.client.requests();
        let body = &requests[0].1;
        assert_eq!(body["inputs"], "Tell a story");
        assert_eq!(body["parameters"]["max_new_tokens"], 64);
        assert_eq!(body["parameters"]["return_full_text"], false);
    }

    #[tokio::test]
    async fn test_huggingface_estimate_follows_chars_per_token() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!([{"generated_text": "once upon a time"}]),
        );
        let provider = HuggingFaceProvider::new(client, "hf_test").with_chars_per_token(8.0);

        let completion = provider.complete("Tell a story", &config()).await.unwrap();

        assert_eq!(completion.token_usage.total(), Some(2));
        assert!(completion.token_usage.is_estimated());
    }

    #[tokio::test]
    async fn test_huggingface_single_object_response() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({"generated_text": "hi"}));
        let provider = HuggingFaceProvider::new(client, "hf_test");

        let completion = provider.complete("Say hi", &config()).await.unwrap();

        assert_eq!(completion.text, "hi");
    }

    #[tokio::test]
    async fn test_huggingface_model_loading_is_transient() {
        let client = MockHttpClient::new().with_status(
            TEST_URL,
            503,
            r#"{"error":"Model gpt2 is currently loading"}"#,
        );
        let provider = HuggingFaceProvider::new(client, "hf_test");

        let error = provider.complete("Say hi", &config()).await.unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::TransientNetworkError);
    }

    #[tokio::test]
    async fn test_huggingface_unexpected_shape() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({"error": "bad things"}));
        let provider = HuggingFaceProvider::new(client, "hf_test");

        let error = provider.complete("Say hi", &config()).await.unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }
}
