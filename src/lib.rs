// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Vocabulary Relay
//!
//! A small HTTP relay that forwards vocabulary-generation requests to a
//! generative-language API. The browser never sees the API key, and every
//! outbound call goes through a rate-limited retry scheduler.
//!
//! ## Features
//!
//! - **Key Hiding**: The upstream key stays on the server
//! - **Shared Pacing**: A minimum interval between upstream dispatches, enforced across concurrent requests
//! - **429 Backoff**: Exponential backoff with jitter on rate-limit errors only
//! - **Fixed Schema**: Responses are constrained to a vocabulary-entry JSON schema
//! - **CORS Gate**: Configurable allowed origins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vocab_relay::{cli::build_service, config::RelayConfig, vocab::VocabularyRequest};
//!
//! #[tokio::main]
//! async fn main() -> vocab_relay::Result<()> {
//!     let config = RelayConfig::load(None)?;
//!     let service = build_service(&config)?;
//!     let response = service
//!         .generate(VocabularyRequest::for_topic("weather", 5))
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! browser ──► axum router (CORS) ──► VocabularyService
//!                                         │ prompt + schema
//!                                         ▼
//!                              RateLimitedCaller.execute
//!                               │ throttle gate (shared)
//!                               │ 429 → backoff → retry
//!                                         ▼
//!                               GenerativeClient (reqwest)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the relay
pub mod error;

/// Common types and type aliases
pub mod types;

/// Rate-limited retry scheduling
pub mod retry;

/// Upstream HTTP client
pub mod http;

/// Vocabulary prompts, schema and service
pub mod vocab;

/// Configuration loading
pub mod config;

/// Command-line interface and HTTP server
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use retry::{RateLimitedCaller, RetryError, RetryPolicy, ThrottleState, UpstreamError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
