//! Deterministic, clearly labelled synthetic responses
//!
//! Used when demo mode is forced by configuration or when a provider call
//! fails because of quota, authentication or rate limiting.

use sha2::{Digest, Sha256};

use crate::domain::experiment::{ModelConfig, Provider};
use crate::domain::llm::ProviderErrorKind;

/// Every synthetic response starts with this marker
pub const DEMO_MARKER: &str = "[DEMO MODE]";

const PROMPT_EXCERPT_CHARS: usize = 100;

/// Why a demo response was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoReason {
    /// Demo mode enabled in configuration; no provider call was attempted
    Forced,
    /// The provider call failed with a fallback-eligible error
    Fallback(ProviderErrorKind),
}

/// Produces demo responses. Pure: identical inputs give identical text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoFallbackGenerator;

impl DemoFallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, prompt: &str, config: &ModelConfig, reason: DemoReason) -> String {
        let templates = templates_for(config.provider);
        let body = templates[template_index(prompt, config, templates.len())];
        let prompt_chars = prompt.chars().count();
        let prompt_words = prompt.split_whitespace().count();

        let mut text = format!(
            "{} Synthetic response, not generated by {} model '{}'.\n",
            DEMO_MARKER,
            config.provider.display_name(),
            config.model_name
        );

        match reason {
            DemoReason::Forced => {
                text.push_str("Demo mode is enabled, so no provider call was made.\n");
            }
            DemoReason::Fallback(kind) => {
                text.push_str(&format!(
                    "The provider call failed ({}). Check your API keys and quota status.\n",
                    kind
                ));
            }
        }

        text.push('\n');
        text.push_str(body);
        text.push_str(&format!(
            "\n\nPrompt: {} characters, {} words. Requested max_tokens={}, temperature={}.",
            prompt_chars, prompt_words, config.max_tokens, config.temperature
        ));

        if prompt.contains('?') || prompt.to_lowercase().contains("question") {
            text.push_str(&format!("\nYour prompt: \"{}\"", excerpt(prompt)));
        }

        text
    }
}

/// Whether a response text came from the demo generator
pub fn is_demo_text(text: &str) -> bool {
    text.starts_with(DEMO_MARKER)
}

fn templates_for(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::OpenAi => &[
            "This placeholder stands in for a chat completion. With a working API key the \
             playground would show the model's actual answer here.",
            "A live deployment would forward your prompt to the chat completions endpoint and \
             display the generated reply in this panel.",
            "This sample illustrates the response format only; its wording is canned and does \
             not reflect the model's capabilities.",
        ],
        Provider::Anthropic => &[
            "This placeholder stands in for a messages API reply. With valid credentials the \
             model's own answer would appear here.",
            "A live deployment would send your prompt to the messages endpoint and render the \
             assistant's reply in this panel.",
            "This sample shows where a detailed, reasoned answer would be displayed once the \
             provider is reachable.",
        ],
        Provider::HuggingFace => &[
            "This placeholder stands in for text generated by a hosted open model. With an \
             inference token the generated continuation would appear here.",
            "A live deployment would call the hosted inference API for this model and show \
             the generated text in this panel.",
            "This sample marks where output from a community model would be displayed once \
             inference is available.",
        ],
    }
}

fn template_index(prompt: &str, config: &ModelConfig, len: usize) -> usize {
    let mut hasher = Sha256::new();
    hasher.update(config.provider.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(config.model_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();

    digest[0] as usize % len
}

fn excerpt(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(PROMPT_EXCERPT_CHARS).collect();

    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
