//! Vocabulary domain
//!
//! Turns learner requests into prompts, constrains the model with a fixed
//! response schema, and runs generation through the rate-limited caller.

mod request;
mod schema;
mod service;

pub use request::{parse_entries, DefineRequest, VocabularyRequest, MAX_ENTRIES};
pub use schema::vocabulary_schema;
pub use service::VocabularyService;
