//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vocabulary relay CLI
#[derive(Parser, Debug)]
#[command(name = "vocab-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the upstream model
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Override the number of rate-limit retries
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP relay
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Allowed CORS origin (repeatable; default allows any origin)
        #[arg(long = "allowed-origin")]
        allowed_origins: Vec<String>,
    },

    /// Generate vocabulary once and print it as JSON
    Generate {
        /// Topic to draw words from
        #[arg(short, long)]
        topic: Option<String>,

        /// Word to define (repeatable)
        #[arg(short, long = "word")]
        words: Vec<String>,

        /// Number of words to generate for a topic
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Learner level (e.g. B1)
        #[arg(long)]
        level: Option<String>,

        /// Language for definitions and examples
        #[arg(long)]
        language: Option<String>,
    },

    /// Print the effective configuration (API key redacted)
    Config,
}
