//! Error classification for outbound calls
//!
//! Upstream failures are tagged once, at the call boundary, so the retry loop
//! only ever matches on a closed set of variants.

use std::time::Duration;
use thiserror::Error;

/// A failure reported by a single outbound call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The upstream rejected the call because of request frequency or quota
    #[error("Rate limited by upstream (429): {message}")]
    RateLimited {
        /// Server-provided hint, if any
        retry_after: Option<Duration>,
        message: String,
    },

    /// Any other failure
    #[error("Upstream error{}: {message}", status_suffix(.status))]
    Other { status: Option<u16>, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

impl UpstreamError {
    /// Classify a raw upstream failure.
    ///
    /// A status of 429, or a message mentioning `429`, is a rate-limit signal.
    /// Some client libraries only surface the status inside the message text.
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == Some(429) || message.contains("429") {
            Self::RateLimited {
                retry_after: None,
                message,
            }
        } else {
            Self::Other { status, message }
        }
    }

    /// Create a non-rate-limit error
    pub fn other(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Other {
            status,
            message: message.into(),
        }
    }

    /// Attach a `Retry-After` hint. No-op for non-rate-limit errors.
    #[must_use]
    pub fn with_retry_after(self, hint: Option<Duration>) -> Self {
        match self {
            Self::RateLimited { message, .. } => Self::RateLimited {
                retry_after: hint,
                message,
            },
            other => other,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status associated with the failure, if known
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Other { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::RateLimited { message, .. } | Self::Other { message, .. } => message,
        }
    }
}

/// Terminal outcome of a failed `execute`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Every allowed attempt was rate limited
    #[error(
        "Upstream quota exhausted after {attempts} attempts. \
         Try again later or reduce the batch size. (last error: {message})"
    )]
    RateLimitExhausted { attempts: u32, message: String },

    /// A non-rate-limit failure, surfaced unchanged
    #[error("{message}")]
    Propagated { status: Option<u16>, message: String },

    /// The caller cancelled while the loop was waiting
    #[error("Request cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl RetryError {
    /// True when the retry budget was spent on rate-limit errors
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::RateLimitExhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Upstream status for propagated failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Propagated { status, .. } => *status,
            _ => None,
        }
    }
}
