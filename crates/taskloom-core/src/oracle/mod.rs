//! Generation oracle
//!
//! The oracle is a black-box text generator with a fixed contract:
//! `generate(prompt, schema_hint) -> text`. Everything that consumes it goes
//! through [`OracleGateway`], which bounds each attempt with a timeout,
//! retries at most once, validates the answer as strict JSON, and caches
//! validated answers. Callers treat any error from the gateway as a signal
//! to use their deterministic generator.

pub mod cache;
pub mod json;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, Message};

pub use cache::{CacheKey, ResponseCache};

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// External text generator
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn generate(&self, prompt: &str, schema_hint: &str) -> Result<String>;

    /// Identifies the generator; used as the cache version
    fn model_id(&self) -> &str;
}

/// Oracle backed by the OpenRouter chat-completions API
#[derive(Debug, Clone)]
pub struct LlmOracle {
    client: LlmClient,
}

impl LlmOracle {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn generate(&self, prompt: &str, schema_hint: &str) -> Result<String> {
        let system = format!(
            "You are a senior software project analyst. Respond with JSON only, \
             no commentary. The response must match this shape:\n{}",
            schema_hint
        );
        let response = self
            .client
            .complete(vec![Message::system(system), Message::user(prompt)])
            .await?;
        Ok(response.content)
    }

    fn model_id(&self) -> &str {
        self.client.model()
    }
}

/// Oracle that is never available. Forces every deterministic path.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

#[async_trait]
impl Oracle for OfflineOracle {
    async fn generate(&self, _prompt: &str, _schema_hint: &str) -> Result<String> {
        Err(Error::OracleUnavailable(
            "no generation service configured".to_string(),
        ))
    }

    fn model_id(&self) -> &str {
        "offline"
    }
}

/// Timeout, retry, validation and caching around an [`Oracle`]
#[derive(Clone)]
pub struct OracleGateway {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    max_retries: u32,
    cache: Option<Arc<ResponseCache>>,
}

impl std::fmt::Debug for OracleGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleGateway")
            .field("model", &self.oracle.model_id())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl OracleGateway {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 1,
            cache: None,
        }
    }

    /// Gateway whose oracle never answers
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineOracle))
    }

    /// Build from configuration: the LLM oracle when an API key is present
    /// in the environment, the offline oracle otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .llm
            .resolved_api_key()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let oracle: Arc<dyn Oracle> = match api_key {
            Some(key) => Arc::new(LlmOracle::new(LlmClient::new(config.llm.clone(), key)?)),
            None => {
                debug!("No API key configured; using deterministic generators");
                Arc::new(OfflineOracle)
            }
        };

        Ok(Self::new(oracle)
            .with_timeout(Duration::from_secs(config.llm.timeout_secs))
            .with_max_retries(config.oracle.max_retries)
            .with_cache(Arc::new(ResponseCache::new(Duration::from_secs(
                config.oracle.cache_ttl_secs,
            )))))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after the first attempt; capped at one
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.min(1);
        self
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn model_id(&self) -> &str {
        self.oracle.model_id()
    }

    /// Ask the oracle and deserialize its answer into `T`.
    ///
    /// Any error returned here belongs to the oracle class.
    pub async fn request<T: DeserializeOwned>(
        &self,
        purpose: &str,
        prompt: &str,
        schema_hint: &str,
    ) -> Result<T> {
        let key = CacheKey::for_prompt(purpose, prompt, self.oracle.model_id());
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            match json::parse_strict::<T>(&cached) {
                Ok(value) => {
                    debug!(purpose, "Oracle cache hit");
                    return Ok(value);
                }
                Err(e) => debug!(purpose, error = %e, "Ignoring unusable cache entry"),
            }
        }

        let mut last_error = Error::OracleUnavailable("no attempt made".to_string());
        for attempt in 0..=self.max_retries {
            match self.attempt::<T>(prompt, schema_hint).await {
                Ok((value, raw)) => {
                    if let Some(cache) = &self.cache {
                        cache.insert(key, raw);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let e = if e.is_oracle_error() {
                        e
                    } else {
                        Error::LLMError(e.to_string())
                    };
                    warn!(purpose, attempt = attempt + 1, error = %e, "Oracle attempt failed");
                    let retryable = !matches!(e, Error::OracleUnavailable(_));
                    last_error = e;
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema_hint: &str,
    ) -> Result<(T, String)> {
        let text = tokio::time::timeout(self.timeout, self.oracle.generate(prompt, schema_hint))
            .await
            .map_err(|_| Error::OracleTimeout(self.timeout.as_secs()))??;

        let raw = json::extract_json(&text)
            .ok_or_else(|| Error::MalformedResponse("no JSON structure found".to_string()))?
            .to_string();
        let value = serde_json::from_str(&raw)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        Ok((value, raw))
    }
}
