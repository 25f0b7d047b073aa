//! Vocabulary generation through the rate-limited caller

use super::request::{parse_entries, VocabularyRequest};
use super::schema::vocabulary_schema;
use crate::error::Result;
use crate::http::Generator;
use crate::retry::{RateLimitedCaller, RetryPolicy};
use crate::types::VocabularyResponse;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Generates vocabulary via one upstream model
#[derive(Clone)]
pub struct VocabularyService {
    generator: Arc<dyn Generator>,
    caller: RateLimitedCaller,
    policy: RetryPolicy,
    model: String,
}

impl VocabularyService {
    pub fn new(
        generator: Arc<dyn Generator>,
        caller: RateLimitedCaller,
        policy: RetryPolicy,
        model: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            caller,
            policy,
            model: model.into(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Validate `request` and generate entries for it
    pub async fn generate(&self, request: VocabularyRequest) -> Result<VocabularyResponse> {
        self.generate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`generate`](Self::generate), abandoning retries once `cancel` fires
    pub async fn generate_with_cancel(
        &self,
        request: VocabularyRequest,
        cancel: &CancellationToken,
    ) -> Result<VocabularyResponse> {
        let request = request.normalized();
        request.validate()?;

        let prompt = request.build_prompt();
        let schema = vocabulary_schema();
        debug!(prompt_len = prompt.len(), "Generating vocabulary");

        let generator = self.generator.as_ref();
        let prompt = prompt.as_str();
        let entries = self
            .caller
            .execute_with_cancel(
                || async move {
                    let value = generator.generate_json(prompt, schema).await?;
                    parse_entries(value)
                },
                &self.policy,
                cancel,
            )
            .await?;

        info!(entries = entries.len(), "Vocabulary generated");

        Ok(VocabularyResponse {
            entries,
            model: self.model.clone(),
            generated_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for VocabularyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyService")
            .field("model", &self.model)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
