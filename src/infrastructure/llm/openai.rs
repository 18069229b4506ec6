use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::{classify_http_failure, HttpClientTrait};
use crate::domain::experiment::ModelConfig;
use crate::domain::llm::{Completion, LlmProvider, ProviderError, TokenUsage, TOTAL_TOKENS};
use crate::domain::metrics::{estimate_tokens, sanitize_chars_per_token, DEFAULT_CHARS_PER_TOKEN};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

const PROVIDER: &str = "openai";

/// OpenAI chat completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    chars_per_token: f64,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
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

    fn estimated_usage(&self, text: &str) -> TokenUsage {
        TokenUsage::estimated(estimate_tokens(
            text.chars().count() as u64,
            self.chars_per_token,
        ))
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, prompt: &str, config: &ModelConfig) -> serde_json::Value {
        serde_json::json!({
            "model": config.model_name,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
            "top_p": config.top_p,
            "frequency_penalty": config.frequency_penalty,
            "presence_penalty": config.presence_penalty,
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Completion, ProviderError> {
        let response: OpenAiResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::malformed_response(PROVIDER, e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::malformed_response(PROVIDER, "No choices in response"))?;

        let token_usage = match response.usage {
            Some(usage) => {
                let total = usage
                    .total_tokens
                    .unwrap_or(usage.prompt_tokens + usage.completion_tokens);

                TokenUsage::new()
                    .with("prompt_tokens", usage.prompt_tokens)
                    .with("completion_tokens", usage.completion_tokens)
                    .with(TOTAL_TOKENS, total)
            }
            None => self.estimated_usage(&text),
        };

        Ok(Completion::new(text, token_usage))
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn complete(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> Result<Completion, ProviderError> {
        let url = self.chat_completions_url();
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

// OpenAI API types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: Option<u64>,
}
