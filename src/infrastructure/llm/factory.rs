use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::http_client::HttpClient;
use super::{AnthropicProvider, HuggingFaceProvider, OpenAiProvider};
use crate::config::ProvidersConfig;
use crate::domain::experiment::{ModelConfig, Provider};
use crate::domain::llm::{Completion, LlmProvider, ProviderError};

/// Values shipped in sample `.env` files; treated as if no key were set
const PLACEHOLDER_KEYS: &[&str] = &[
    "your_openai_api_key_here",
    "your_anthropic_api_key_here",
    "your_huggingface_api_key_here",
    "your_api_key_here",
    "changeme",
];

/// Environment variable holding the credential for a provider
pub fn api_key_env_var(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI_API_KEY",
        Provider::Anthropic => "ANTHROPIC_API_KEY",
        Provider::HuggingFace => "HUGGINGFACE_API_KEY",
    }
}

/// Normalize a raw credential; blank and placeholder values count as absent
pub fn usable_api_key(raw: Option<String>) -> Option<String> {
    let key = raw?.trim().to_string();

    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key.to_lowercase().as_str()) {
        return None;
    }

    Some(key)
}

/// Provider credentials, read from the process environment only
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    keys: HashMap<Provider, String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("configured", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys = Provider::ALL
            .into_iter()
            .filter_map(|provider| {
                usable_api_key(lookup(api_key_env_var(provider))).map(|key| (provider, key))
            })
            .collect();

        Self { keys }
    }

    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        if let Some(key) = usable_api_key(Some(key.into())) {
            self.keys.insert(provider, key);
        }
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }
}

/// Stands in for a provider without credentials; every call is an auth failure
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredProvider {
    provider: Provider,
}

impl UnconfiguredProvider {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    async fn complete(
        &self,
        _prompt: &str,
        _config: &ModelConfig,
    ) -> Result<Completion, ProviderError> {
        Err(ProviderError::auth(
            self.provider.as_str(),
            format!("{} is not set", api_key_env_var(self.provider)),
        ))
    }

    fn provider_name(&self) -> &'static str {
        self.provider.as_str()
    }
}

/// One client per provider variant
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, Arc<dyn LlmProvider>>,
    configured: HashMap<Provider, bool>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Registry where every provider is unconfigured
    pub fn new() -> Self {
        let providers = Provider::ALL
            .into_iter()
            .map(|p| (p, Arc::new(UnconfiguredProvider::new(p)) as Arc<dyn LlmProvider>))
            .collect();
        let configured = Provider::ALL.into_iter().map(|p| (p, false)).collect();

        Self {
            providers,
            configured,
        }
    }

    /// Build reqwest backed clients for every provider with a usable key.
    ///
    /// `chars_per_token` drives the token estimate for replies without usage.
    pub fn from_config(
        config: &ProvidersConfig,
        credentials: &ProviderCredentials,
        chars_per_token: f64,
    ) -> Self {
        let mut registry = Self::new();

        for provider in Provider::ALL {
            let Some(key) = credentials.get(provider) else {
                continue;
            };

            let client: Arc<dyn LlmProvider> = match provider {
                Provider::OpenAi => Arc::new(
                    OpenAiProvider::with_base_url(HttpClient::new(), key, &config.openai_base_url)
                        .with_chars_per_token(chars_per_token),
                ),
                Provider::Anthropic => Arc::new(
                    AnthropicProvider::with_base_url(
                        HttpClient::new(),
                        key,
                        &config.anthropic_base_url,
                    )
                    .with_chars_per_token(chars_per_token),
                ),
                Provider::HuggingFace => Arc::new(
                    HuggingFaceProvider::with_base_url(
                        HttpClient::new(),
                        key,
                        &config.huggingface_base_url,
                    )
                    .with_chars_per_token(chars_per_token),
                ),
            };

            registry = registry.with_provider(provider, client);
        }

        registry
    }

    pub fn with_provider(mut self, provider: Provider, client: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider, client);
        self.configured.insert(provider, true);
        self
    }

    pub fn get(&self, provider: Provider) -> Arc<dyn LlmProvider> {
        self.providers
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| Arc::new(UnconfiguredProvider::new(provider)))
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.configured.get(&provider).copied().unwrap_or(false)
    }
}
