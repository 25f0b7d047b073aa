//! Response schema sent to the upstream model
//!
//! Uses the OpenAPI subset accepted by `generationConfig.responseSchema`.

use crate::types::JsonValue;
use once_cell::sync::Lazy;
use serde_json::json;

static VOCABULARY_SCHEMA: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "word": { "type": "STRING" },
                "partOfSpeech": { "type": "STRING" },
                "pronunciation": { "type": "STRING" },
                "definition": { "type": "STRING" },
                "example": { "type": "STRING" },
                "synonyms": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                }
            },
            "required": ["word", "partOfSpeech", "definition", "example"],
            "propertyOrdering": [
                "word",
                "partOfSpeech",
                "pronunciation",
                "definition",
                "example",
                "synonyms"
            ]
        }
    })
});

/// Schema for an array of vocabulary entries
pub fn vocabulary_schema() -> &'static JsonValue {
    &VOCABULARY_SCHEMA
}
