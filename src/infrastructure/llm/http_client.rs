use async_trait::async_trait;
use thiserror::Error;

use crate::domain::llm::ProviderError;

/// Transport level failure, classified into a [`ProviderError`] by the caller
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HttpError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))
    }
}

// ============================================================================
// Failure classification
// ============================================================================

const QUOTA_HINTS: &[&str] = &["insufficient_quota", "quota", "billing", "credit"];

fn mentions_quota(body: &str) -> bool {
    let body = body.to_lowercase();
    QUOTA_HINTS.iter().any(|hint| body.contains(hint))
}

/// Map a transport failure onto the provider error taxonomy.
///
/// 429 is ambiguous across providers: a body mentioning quota or billing
/// means the account is out of credit, anything else is plain rate limiting.
pub fn classify_http_failure(provider: &str, error: HttpError) -> ProviderError {
    match error {
        HttpError::Status { status, body } => match status {
            401 | 403 => ProviderError::auth(provider, format!("HTTP {}: {}", status, body)),
            402 => ProviderError::quota_exceeded(provider, format!("HTTP {}: {}", status, body)),
            429 if mentions_quota(&body) => {
                ProviderError::quota_exceeded(provider, format!("HTTP {}: {}", status, body))
            }
            429 => ProviderError::rate_limited(provider, format!("HTTP {}: {}", status, body)),
            400 | 404 | 413 | 422 if mentions_quota(&body) => {
                ProviderError::quota_exceeded(provider, format!("HTTP {}: {}", status, body))
            }
            400 | 404 | 413 | 422 => {
                ProviderError::invalid_request(provider, format!("HTTP {}: {}", status, body))
            }
            408 | 500..=599 => {
                ProviderError::transient(provider, format!("HTTP {}: {}", status, body))
            }
            _ => ProviderError::invalid_request(provider, format!("HTTP {}: {}", status, body)),
        },
        HttpError::Network(message) => ProviderError::transient(provider, message),
        HttpError::Decode(message) => ProviderError::malformed_response(provider, message),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ProviderErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status(status: u16, body: &str) -> HttpError {
        HttpError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_classify_statuses() {
        let cases = [
            (401, "", ProviderErrorKind::AuthError),
            (403, "forbidden", ProviderErrorKind::AuthError),
            (402, "", ProviderErrorKind::QuotaExceeded),
            (429, "slow down", ProviderErrorKind::RateLimited),
            (
                429,
                r#"{"error":{"code":"insufficient_quota"}}"#,
                ProviderErrorKind::QuotaExceeded,
            ),
            (400, "max_tokens too large", ProviderErrorKind::InvalidRequest),
            (
                400,
                "Your credit balance is too low",
                ProviderErrorKind::QuotaExceeded,
            ),
            (404, "model not found", ProviderErrorKind::InvalidRequest),
            (408, "", ProviderErrorKind::TransientNetworkError),
            (500, "", ProviderErrorKind::TransientNetworkError),
            (503, "", ProviderErrorKind::TransientNetworkError),
            (529, "overloaded", ProviderErrorKind::TransientNetworkError),
        ];

        for (code, body, expected) in cases {
            let error = classify_http_failure("openai", status(code, body));
            assert_eq!(error.kind, expected, "status {} body {:?}", code, body);
            assert_eq!(error.provider, "openai");
        }
    }

    #[test]
    fn test_classify_network_and_decode() {
        let network = classify_http_failure("anthropic", HttpError::Network("reset".into()));
        assert_eq!(network.kind, ProviderErrorKind::TransientNetworkError);

        let decode = classify_http_failure("anthropic", HttpError::Decode("eof".into()));
        assert_eq!(decode.kind, ProviderErrorKind::InvalidRequest);
        assert!(decode.message.contains("malformed response"));
    }

    #[tokio::test]
    async fn test_http_client_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/echo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/v1/echo", server.uri());

        let response = client
            .post_json(&url, vec![("x-test", "1")], &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(response["ok"], true);
    }

    #[tokio::test]
    async fn test_http_client_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("insufficient_quota"))
            .mount(&server)
            .await;

        let client = HttpClient::new();

        let error = client
            .post_json(&server.uri(), vec![], &serde_json::json!({}))
            .await
            .unwrap_err();

        assert_eq!(error, status(429, "insufficient_quota"));
        assert_eq!(
            classify_http_failure("openai", error).kind,
            ProviderErrorKind::QuotaExceeded
        );
    }

    #[tokio::test]
    async fn test_http_client_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = HttpClient::new();

        let error = client
            .post_json(&server.uri(), vec![], &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(error, HttpError::Decode(_)));
    }
}
