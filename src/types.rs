//! Common types used throughout the relay
//!
//! Wire types shared by the server, the CLI and the vocabulary module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Vocabulary Types
// ============================================================================

/// One generated vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    /// The headword
    pub word: String,
    /// Part of speech (noun, verb, ...)
    pub part_of_speech: String,
    /// IPA or phonetic spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    /// Learner-friendly definition
    pub definition: String,
    /// Example sentence using the word
    pub example: String,
    /// Related words
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

/// Successful generation result returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyResponse {
    pub entries: Vec<VocabularyEntry>,
    /// Upstream model that produced the entries
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_uses_camel_case() {
        let entry: VocabularyEntry = serde_json::from_value(json!({
            "word": "ephemeral",
            "partOfSpeech": "adjective",
            "definition": "lasting a very short time",
            "example": "Fame in the age of memes is ephemeral."
        }))
        .unwrap();

        assert_eq!(entry.part_of_speech, "adjective");
        assert!(entry.pronunciation.is_none());
        assert!(entry.synonyms.is_empty());

        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("partOfSpeech").is_some());
        assert!(value.get("synonyms").is_none());
    }
}
