//! Language-model-assisted extraction.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::extractor::{parse_candidates, ExtractionError, Extractor};
use super::scraper::Corpus;
use super::types::{CandidateRecord, TorrentList};
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LlmClient};

/// Asks a language model to turn the corpus into records matching a pinned schema.
pub struct ModelAssistedExtractor {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
}

impl ModelAssistedExtractor {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 4096,
            temperature: 0.1,
            system_prompt: system_prompt(),
        }
    }

    pub fn from_config(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self::new(client)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Instructions with the compact JSON schema of the expected output.
pub fn system_prompt() -> String {
    let schema = schemars::schema_for!(TorrentList);
    let schema = serde_json::to_string(&schema).unwrap_or_default();

    format!(
        "You extract torrent listings from scraped search result pages.\n\
         The input contains one block per website. Each block starts with a line \
         \"SCRAPING WEBSITE SOURCE -> <website>:\" and ends with \"----------\". \
         Blocks starting with \"ERROR SCRAPING\" contain no listings.\n\
         Rules:\n\
         - Return every torrent-like entry you can find, from every block.\n\
         - Copy magnet links exactly and completely. Never shorten or truncate them.\n\
         - Set website_source to the website name of the block the entry came from.\n\
         - seeders and leechers are integers without separators.\n\
         - If nothing matches, return {{\"torrents\": []}}.\n\
         Reply with JSON only, conforming to this schema:\n{}",
        schema
    )
}

#[async_trait]
impl Extractor for ModelAssistedExtractor {
    fn name(&self) -> &str {
        "model_assisted"
    }

    async fn extract(&self, corpus: &Corpus) -> Result<Vec<CandidateRecord>, ExtractionError> {
        if !corpus.has_content() {
            return Ok(Vec::new());
        }

        let request = CompletionRequest::new(corpus.text())
            .with_system(self.system_prompt.as_str())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_json_mode(true);

        let response = self.client.complete(request).await?;
        debug!(
            provider = self.client.provider(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Model extraction completed"
        );

        parse_candidates(&response.text)
    }
}
