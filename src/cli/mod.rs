//! CLI module
//!
//! Command-line interface for the relay.
//!
//! # Commands
//!
//! - `serve` - Start the HTTP relay
//! - `generate` - One-shot generation printed to stdout
//! - `config` - Show the effective configuration

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands};
pub use runner::{build_service, Runner};
pub use server::{router, serve, ServerConfig};
