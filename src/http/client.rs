//! Client for the upstream generative-language API
//!
//! Sends one `generateContent` request per call and classifies every failure
//! into an [`UpstreamError`] before it leaves this module:
//! - Non-2xx responses are tagged rate-limited or not, with `Retry-After`
//! - Transport failures carry no status (timeouts map to 504)
//! - Missing or unparsable candidates map to 502

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::retry::UpstreamError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Produces schema-constrained JSON from a prompt
///
/// This is the seam between the HTTP handlers and the upstream API.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run `prompt` and return the model's JSON answer
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> std::result::Result<Value, UpstreamError>;
}

/// Configuration for the generative client
#[derive(Clone)]
pub struct GenerativeClientConfig {
    /// API host, without the version path
    pub base_url: String,
    /// Model name (e.g. `gemini-1.5-flash`)
    pub model: String,
    /// Secret API key, sent as a header and never logged
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional local quota guard
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl GenerativeClientConfig {
    /// Create a config with defaults for everything but the key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            rate_limit: None,
            user_agent: format!("vocab-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the local quota guard
    #[must_use]
    pub fn rate_limit(mut self, config: Option<RateLimiterConfig>) -> Self {
        self.rate_limit = config;
        self
    }
}

impl std::fmt::Debug for GenerativeClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeClientConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// HTTP client for `generateContent`
pub struct GenerativeClient {
    client: Client,
    endpoint: Url,
    config: GenerativeClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl GenerativeClient {
    /// Create a client, validating the endpoint URL up front
    pub fn new(config: GenerativeClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::missing_field("api_key"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let endpoint = build_endpoint(&config.base_url, &config.model)?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            endpoint,
            config,
            rate_limiter,
        })
    }

    /// The resolved `generateContent` URL
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Check if the local quota guard is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    async fn send(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> std::result::Result<Value, UpstreamError> {
        if let Some(ref limiter) = self.rate_limiter {
            if !limiter.try_acquire() {
                debug!("Local quota guard is empty, waiting for a permit");
                limiter.wait().await;
            }
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });

        debug!("POST {} (model {})", self.endpoint, self.config.model);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = extract_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(status, &text);
            warn!("Upstream returned {}: {}", status.as_u16(), message);
            return Err(UpstreamError::classify(Some(status.as_u16()), message)
                .with_retry_after(retry_after));
        }

        let payload: Value = response.json().await.map_err(|e| {
            UpstreamError::other(Some(502), format!("Upstream returned invalid JSON: {e}"))
        })?;

        extract_candidate_json(&payload)
    }
}

#[async_trait]
impl Generator for GenerativeClient {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> std::result::Result<Value, UpstreamError> {
        self.send(prompt, schema).await
    }
}

impl std::fmt::Debug for GenerativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Build the `generateContent` URL for a model
fn build_endpoint(base_url: &str, model: &str) -> Result<Url> {
    let base = base_url.trim_end_matches('/');
    let model = model.trim_start_matches("models/");
    Ok(Url::parse(&format!(
        "{base}/v1beta/models/{model}:generateContent"
    ))?)
}

/// Transport failures never carry an upstream 429, so they are never retried.
/// The URL is stripped so the message cannot leak or mimic a status.
fn classify_transport_error(e: reqwest::Error) -> UpstreamError {
    let timed_out = e.is_timeout();
    let message = error_chain(&e.without_url());

    if timed_out {
        UpstreamError::other(Some(504), format!("Upstream request timed out: {message}"))
    } else {
        UpstreamError::other(None, format!("Upstream request failed: {message}"))
    }
}

/// Render an error with its `source()` causes, outermost first
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {cause}");
        source = cause.source();
    }
    message
}

/// Pull `error.message` out of a Google-style error body, falling back to the raw text
fn extract_error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("Unknown upstream error")
            .to_string(),
    }
}

/// Extract `candidates[0].content.parts[0].text` and parse it as JSON
fn extract_candidate_json(payload: &Value) -> std::result::Result<Value, UpstreamError> {
    let Some(text) = payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
    else {
        let reason = payload
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
            .or_else(|| {
                payload
                    .pointer("/candidates/0/finishReason")
                    .and_then(Value::as_str)
            })
            .unwrap_or("no candidates");
        return Err(UpstreamError::other(
            Some(502),
            format!("Upstream returned no usable content ({reason})"),
        ));
    };

    serde_json::from_str(text).map_err(|e| {
        UpstreamError::other(
            Some(502),
            format!("Upstream content is not valid JSON: {e}"),
        )
    })
}

/// Extract retry-after header value
fn extract_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs)
}
