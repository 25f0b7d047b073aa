//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::RelayConfig;
use crate::error::{Result, ResultExt};
use crate::http::GenerativeClient;
use crate::retry::{RateLimitedCaller, ThrottleState};
use crate::vocab::{VocabularyRequest, VocabularyService};
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let mut config = RelayConfig::load(self.cli.config.as_deref())?;
        self.apply_overrides(&mut config);
        config.validate()?;

        match &self.cli.command {
            Commands::Serve {
                port,
                allowed_origins,
            } => {
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if !allowed_origins.is_empty() {
                    config.server.allowed_origins.clone_from(allowed_origins);
                }
                let service = build_service(&config)?;
                let server = crate::cli::ServerConfig {
                    port: config.server.port,
                    allowed_origins: config.server.allowed_origins.clone(),
                };
                crate::cli::serve(server, service).await
            }
            Commands::Generate {
                topic,
                words,
                count,
                level,
                language,
            } => {
                let request = VocabularyRequest {
                    topic: topic.clone(),
                    words: words.clone(),
                    count: *count,
                    level: level.clone(),
                    language: language.clone(),
                };
                self.generate(&config, request).await
            }
            Commands::Config => self.show_config(&config),
        }
    }

    /// Apply global CLI flags on top of file and environment settings
    fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(model) = &self.cli.model {
            config.upstream.model.clone_from(model);
        }
        if let Some(max_retries) = self.cli.max_retries {
            config.retry.max_retries = max_retries;
        }
    }

    async fn generate(&self, config: &RelayConfig, request: VocabularyRequest) -> Result<()> {
        let service = build_service(config)?;
        let response = service.generate(request).await?;
        let rendered =
            serde_json::to_string_pretty(&response).context("Failed to render response")?;
        println!("{rendered}");
        Ok(())
    }

    fn show_config(&self, config: &RelayConfig) -> Result<()> {
        print!("{}", config.to_yaml()?);
        let key_state = if config.upstream.api_key.is_some() {
            "set"
        } else {
            "not set"
        };
        println!("# {}: {key_state}", config.upstream.api_key_env);
        Ok(())
    }
}

/// Wire the upstream client, throttle and retry policy into a service
pub fn build_service(config: &RelayConfig) -> Result<VocabularyService> {
    let client = GenerativeClient::new(config.client_config()?)?;
    let caller = RateLimitedCaller::new(ThrottleState::new());
    Ok(VocabularyService::new(
        Arc::new(client),
        caller,
        config.retry.policy(),
        config.upstream.model.clone(),
    ))
}
