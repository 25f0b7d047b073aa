//! Relay configuration
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables (a `.env` file is honored), then CLI flags.

use crate::error::{Error, Result};
use crate::http::{
    GenerativeClientConfig, QuotaTier, RateLimiterConfig, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the listen port
pub const PORT_ENV: &str = "PORT";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Upstream API settings
    #[serde(default)]
    pub upstream: UpstreamSettings,

    /// Retry and pacing settings
    #[serde(default)]
    pub retry: RetrySettings,
}

// ============================================================================
// Server
// ============================================================================

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS (empty = any origin)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

// ============================================================================
// Upstream
// ============================================================================

/// Upstream API settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// API host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional local quota guard; takes precedence over `quota_tier`
    #[serde(default)]
    pub requests_per_minute: Option<u32>,

    /// Burst allowance for `requests_per_minute`
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Published quota preset (`free` or `paid`)
    #[serde(default)]
    pub quota_tier: Option<QuotaTier>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API key, resolved from the environment. Never read from or written to files.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_burst_size() -> u32 {
    1
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            requests_per_minute: None,
            burst_size: default_burst_size(),
            quota_tier: None,
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl UpstreamSettings {
    /// Local quota guard settings, if any are configured
    pub fn rate_limit(&self) -> Option<RateLimiterConfig> {
        match (self.requests_per_minute, self.quota_tier) {
            (Some(rpm), _) => Some(RateLimiterConfig::new(rpm, self.burst_size)),
            (None, Some(tier)) => Some(tier.limits()),
            (None, None) => None,
        }
    }
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("burst_size", &self.burst_size)
            .field("quota_tier", &self.quota_tier)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Retry and pacing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_min_interval_ms() -> u64 {
    4000
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_jitter_max_ms() -> u64 {
    500
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            min_interval_ms: default_min_interval_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            jitter_max_ms: default_jitter_max_ms(),
        }
    }
}

impl RetrySettings {
    /// Convert to a retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.min_interval_ms),
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }
}

// ============================================================================
// Loading
// ============================================================================

impl RelayConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load defaults or `path`, then apply `.env` and process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        check_dotenv(dotenvy::dotenv())?;

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::invalid_value(PORT_ENV, format!("not a port: {port}")))?;
        }

        if let Some(key) = lookup(&self.upstream.api_key_env).filter(|k| !k.trim().is_empty()) {
            self.upstream.api_key = Some(key);
        }

        Ok(())
    }

    /// Reject values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.upstream.model.trim().is_empty() {
            return Err(Error::invalid_value("upstream.model", "must not be empty"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(Error::invalid_value(
                "upstream.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.upstream.requests_per_minute == Some(0) {
            return Err(Error::invalid_value(
                "upstream.requests_per_minute",
                "must be greater than zero",
            ));
        }
        if self.upstream.burst_size == 0 {
            return Err(Error::invalid_value(
                "upstream.burst_size",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// The API key, or an error naming the variable to set
    pub fn api_key(&self) -> Result<&str> {
        self.upstream
            .api_key
            .as_deref()
            .ok_or_else(|| Error::missing_field(self.upstream.api_key_env.clone()))
    }

    /// Build the upstream client config. Requires the API key.
    pub fn client_config(&self) -> Result<GenerativeClientConfig> {
        Ok(GenerativeClientConfig::new(self.api_key()?)
            .base_url(&self.upstream.base_url)
            .model(&self.upstream.model)
            .timeout(Duration::from_secs(self.upstream.timeout_secs))
            .rate_limit(self.upstream.rate_limit()))
    }

    /// Render as YAML (the API key is never serialized)
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// A missing `.env` file is normal; an unreadable or malformed one is not
fn check_dotenv<T: std::fmt::Debug>(result: dotenvy::Result<T>) -> Result<()> {
    match result {
        Ok(loaded) => {
            debug!(?loaded, "Loaded .env file");
            Ok(())
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::config(format!("Failed to load .env file: {e}"))),
    }
}
