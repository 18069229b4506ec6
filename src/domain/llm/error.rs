//! Classified provider failures

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure classes every provider call is mapped onto.
///
/// The scheduler's fallback policy keys off this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    QuotaExceeded,
    AuthError,
    RateLimited,
    TransientNetworkError,
    InvalidRequest,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::AuthError => "auth_error",
            Self::RateLimited => "rate_limited",
            Self::TransientNetworkError => "transient_network_error",
            Self::InvalidRequest => "invalid_request",
        }
    }

    /// Whether this failure is answered with a demo response instead of an error record
    pub fn triggers_demo_fallback(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded | Self::AuthError | Self::RateLimited
        )
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by an LLM provider call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(
        kind: ProviderErrorKind,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn quota_exceeded(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::QuotaExceeded, provider, message)
    }

    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::AuthError, provider, message)
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, provider, message)
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::TransientNetworkError, provider, message)
    }

    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, provider, message)
    }

    /// A provider answered, but not in the shape we expect
    pub fn malformed_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ProviderErrorKind::InvalidRequest,
            provider,
            format!("malformed response: {}", message.into()),
        )
    }

    pub fn triggers_demo_fallback(&self) -> bool {
        self.kind.triggers_demo_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_policy() {
        assert!(ProviderErrorKind::QuotaExceeded.triggers_demo_fallback());
        assert!(ProviderErrorKind::AuthError.triggers_demo_fallback());
        assert!(ProviderErrorKind::RateLimited.triggers_demo_fallback());
        assert!(!ProviderErrorKind::TransientNetworkError.triggers_demo_fallback());
        assert!(!ProviderErrorKind::InvalidRequest.triggers_demo_fallback());
    }

    #[test]
    fn test_malformed_response_is_not_demo() {
        let err = ProviderError::malformed_response("openai", "No choices in response");

        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
        assert!(!err.triggers_demo_fallback());
        assert_eq!(
            err.to_string(),
            "openai invalid_request: malformed response: No choices in response"
        );
    }
}
