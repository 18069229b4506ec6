//! LLM provider implementations

mod anthropic;
mod factory;
mod http_client;
mod huggingface;
mod openai;

pub use anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_BASE_URL};
pub use factory::{
    api_key_env_var, usable_api_key, ProviderCredentials, ProviderRegistry, UnconfiguredProvider,
};
pub use http_client::{classify_http_failure, HttpClient, HttpClientTrait, HttpError};
pub use huggingface::{HuggingFaceProvider, DEFAULT_HUGGINGFACE_BASE_URL};
pub use openai::{OpenAiProvider, DEFAULT_OPENAI_BASE_URL};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
