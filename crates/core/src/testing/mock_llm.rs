//! Mock LLM client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

/// Mock implementation of the LlmClient trait.
///
/// Queued outcomes are returned first, in order. Once the queue is empty
/// every call gets the default outcome, which starts as an empty torrent list.
#[derive(Debug)]
pub struct MockLlmClient {
    model: String,
    /// Outcomes for the next calls.
    queued: Arc<RwLock<VecDeque<Result<String, LlmError>>>>,
    /// Outcome once the queue is drained.
    default: Arc<RwLock<Result<String, LlmError>>>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            queued: Arc::new(RwLock::new(VecDeque::new())),
            default: Arc::new(RwLock::new(Ok(r#"{"torrents": []}"#.to_string()))),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a completion text for the next call.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.queued.write().await.push_back(Ok(text.into()));
    }

    /// Queue a failure for the next call.
    pub async fn push_error(&self, error: LlmError) {
        self.queued.write().await.push_back(Err(error));
    }

    /// Set the completion returned once the queue is drained.
    pub async fn set_default_response(&self, text: impl Into<String>) {
        *self.default.write().await = Ok(text.into());
    }

    /// Make every call fail once the queue is drained.
    pub async fn set_default_error(&self, error: LlmError) {
        *self.default.write().await = Err(error);
    }

    /// Get recorded requests.
    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of completions requested.
    pub async fn call_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let input_tokens = (request.prompt.len() / 4) as u32;
        self.requests.write().await.push(request);

        let next = self.queued.write().await.pop_front();
        let outcome = match next {
            Some(outcome) => outcome,
            None => self.default.read().await.clone(),
        };

        outcome.map(|text| CompletionResponse {
            usage: LlmUsage {
                input_tokens,
                output_tokens: (text.len() / 4) as u32,
            },
            text,
            model: self.model.clone(),
        })
    }
}
