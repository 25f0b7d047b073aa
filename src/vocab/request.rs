//! Vocabulary requests and prompt rendering

use crate::error::{Error, Result};
use crate::retry::UpstreamError;
use crate::types::{JsonValue, VocabularyEntry};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Most entries a single request may ask for
pub const MAX_ENTRIES: usize = 50;

/// Request body for vocabulary generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyRequest {
    /// Theme to draw words from (e.g. "weather")
    #[serde(default)]
    pub topic: Option<String>,
    /// Explicit words to define
    #[serde(default)]
    pub words: Vec<String>,
    /// Number of words to generate for a topic
    #[serde(default = "default_count")]
    pub count: usize,
    /// Learner level (e.g. "B1", "beginner")
    #[serde(default)]
    pub level: Option<String>,
    /// Language for definitions and examples
    #[serde(default)]
    pub language: Option<String>,
}

fn default_count() -> usize {
    10
}

impl Default for VocabularyRequest {
    fn default() -> Self {
        Self {
            topic: None,
            words: Vec::new(),
            count: default_count(),
            level: None,
            language: None,
        }
    }
}

/// Request body for a single-word definition
#[derive(Debug, Clone, Deserialize)]
pub struct DefineRequest {
    pub word: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl From<DefineRequest> for VocabularyRequest {
    fn from(req: DefineRequest) -> Self {
        Self {
            topic: None,
            words: vec![req.word],
            count: 1,
            level: req.level,
            language: req.language,
        }
    }
}

impl VocabularyRequest {
    /// Request definitions for specific words
    pub fn for_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        Self {
            count: words.len(),
            words,
            ..Self::default()
        }
    }

    /// Request `count` words about a topic
    pub fn for_topic(topic: impl Into<String>, count: usize) -> Self {
        Self {
            topic: Some(topic.into()),
            count,
            ..Self::default()
        }
    }

    /// Trim inputs and drop blank words
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.words = self
            .words
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        self.topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    /// Check the request is answerable
    pub fn validate(&self) -> Result<()> {
        if self.topic.is_none() && self.words.is_empty() {
            return Err(Error::invalid_request(
                "Provide a topic or at least one word",
            ));
        }
        if self.words.len() > MAX_ENTRIES {
            return Err(Error::invalid_request(format!(
                "Too many words ({}); the limit is {MAX_ENTRIES} per request",
                self.words.len()
            )));
        }
        if self.words.is_empty() && !(1..=MAX_ENTRIES).contains(&self.count) {
            return Err(Error::invalid_request(format!(
                "count must be between 1 and {MAX_ENTRIES}"
            )));
        }
        Ok(())
    }

    /// Render the instruction prompt
    pub fn build_prompt(&self) -> String {
        let mut prompt = String::from("You are a vocabulary tutor. ");

        if self.words.is_empty() {
            let topic = self.topic.as_deref().unwrap_or("general English");
            let _ = write!(
                prompt,
                "Generate {} useful vocabulary words about \"{topic}\".",
                self.count
            );
        } else {
            let _ = write!(
                prompt,
                "Define each of these words: {}.",
                self.words.join(", ")
            );
            if let Some(topic) = &self.topic {
                let _ = write!(prompt, " Use examples related to \"{topic}\".");
            }
        }

        if let Some(level) = &self.level {
            let _ = write!(prompt, " Target learners at the {level} level.");
        }
        if let Some(language) = &self.language {
            let _ = write!(
                prompt,
                " Write definitions and examples in {language}."
            );
        }

        prompt.push_str(
            " For every word give its part of speech, pronunciation, a short definition, \
             one natural example sentence, and up to three synonyms.",
        );
        prompt
    }
}

/// Decode the model's JSON answer into entries.
///
/// A schema mismatch is an upstream fault, reported as 502.
pub fn parse_entries(
    value: JsonValue,
) -> std::result::Result<Vec<VocabularyEntry>, UpstreamError> {
    serde_json::from_value(value).map_err(|e| {
        UpstreamError::other(
            Some(502),
            format!("Upstream content does not match the vocabulary schema: {e}"),
        )
    })
}
