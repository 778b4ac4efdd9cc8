//! Extraction strategy abstraction.

use async_trait::async_trait;
use thiserror::Error;

use super::scraper::Corpus;
use super::types::CandidateRecord;
use crate::llm::LlmError;

/// Why an extraction attempt failed. Every variant triggers a retry.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("No JSON array found in completion")]
    NoJsonArray,

    #[error("Unbalanced JSON array in completion")]
    UnbalancedArray,

    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed table from {source_name}: {reason}")]
    MalformedTable { source_name: String, reason: String },

    #[error("Malformed corpus: {0}")]
    MalformedCorpus(String),
}

/// Turns a corpus into candidate records.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Strategy name for logging and metrics.
    fn name(&self) -> &str;

    async fn extract(&self, corpus: &Corpus) -> Result<Vec<CandidateRecord>, ExtractionError>;
}

/// Locate the first balanced top-level JSON array in `text`.
///
/// Brackets inside JSON strings (including escaped quotes) are ignored once
/// the array has opened.
pub fn extract_json_array(text: &str) -> Result<&str, ExtractionError> {
    let start = text.find('[').ok_or(ExtractionError::NoJsonArray)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    Err(ExtractionError::UnbalancedArray)
}

/// Decode the first JSON array in a completion into candidates.
pub fn parse_candidates(text: &str) -> Result<Vec<CandidateRecord>, ExtractionError> {
    let array = extract_json_array(text)?;
    serde_json::from_str(array).map_err(|e| ExtractionError::Json(e.to_string()))
}
