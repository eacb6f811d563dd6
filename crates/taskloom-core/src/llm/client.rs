//! OpenRouter chat-completions client
//!
//! A single request per call. Retry and timeout policy belong to the
//! oracle gateway, which decides when to fall back.

use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, LlmResponse, Message};

/// OpenRouter API base URL
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// HTTP client for OpenRouter
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for [`LlmClient`]
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API endpoint (useful for self-hosted gateways)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .ok_or_else(|| Error::OracleUnavailable("API key is required".to_string()))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(LlmClient {
            http_client,
            config,
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one chat completion request with the configured model
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatRequest::new(self.config.model.clone(), messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        self.send_request(&request).await
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Taskloom")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::OracleTimeout(self.config.timeout_secs)
                } else {
                    Error::NetworkError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::MalformedResponse("Empty response from API".to_string()))
    }
}

/// Map a non-success HTTP status onto the oracle error class
fn map_error_status(status: u16, body: &str) -> Error {
    match status {
        401 => Error::OracleUnavailable(
            "Unauthorized: invalid API key. Set TASKLOOM_API_KEY or OPENROUTER_API_KEY."
                .to_string(),
        ),
        402 => Error::OracleUnavailable(
            "Payment required: insufficient credits on OpenRouter account".to_string(),
        ),
        429 => Error::RateLimited(extract_retry_after(body).unwrap_or(60)),
        400 => Error::LLMError(format!("Bad request: {}", body)),
        403 => Error::LLMError(format!("Forbidden: {}", body)),
        404 => Error::LLMError(format!("Model not found or endpoint unavailable: {}", body)),
        500..=599 => Error::LLMError(format!("Server error ({}): {}", status, body)),
        _ => Error::LLMError(format!("HTTP error {}: {}", status, body)),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error").and_then(|e| e.get("retry_after")))
        .and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: None,
            model: "test/model".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_client_builder() {
        let client = LlmClient::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("https://example.com")
            .build()
            .unwrap();

        assert_eq!(client.model(), "test/model");
        assert_eq!(client.base_url, "https://example.com");
    }

    #[test]
    fn test_client_builder_requires_api_key() {
        let err = LlmClient::builder()
            .config(test_config())
            .build()
            .unwrap_err();
        assert!(err.is_oracle_error());
    }

    #[test]
    fn test_debug_hides_key() {
        let client = LlmClient::new(test_config(), "sk-secret").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("test/model"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_error_status(401, ""), Error::OracleUnavailable(_)));
        assert!(matches!(map_error_status(429, ""), Error::RateLimited(60)));
        assert!(matches!(map_error_status(503, "down"), Error::LLMError(_)));
        assert!(map_error_status(418, "").is_oracle_error());
    }

    #[test]
    fn test_extract_retry_after() {
        assert_eq!(extract_retry_after(r#"{"retry_after": 12}"#), Some(12));
        assert_eq!(
            extract_retry_after(r#"{"error": {"retry_after": 3}}"#),
            Some(3)
        );
        assert_eq!(extract_retry_after("not json"), None);
        assert!(matches!(
            map_error_status(429, r#"{"retry_after": 7}"#),
            Error::RateLimited(7)
        ));
    }
}
