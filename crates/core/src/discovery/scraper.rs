//! Multi-source scraping into an annotated corpus.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, PageFetcher};
use super::normalizer::Normalizer;
use super::sources::{Source, SourceRegistry};
use crate::metrics;

/// Prefix of the line that opens a source block.
pub const MARKER_PREFIX: &str = "SCRAPING WEBSITE SOURCE -> ";

/// Line that closes a source block.
pub const DELIMITER: &str = "----------";

/// Prefix of the body recorded for a failed source.
pub const ERROR_PREFIX: &str = "ERROR SCRAPING ";

const MAX_REASON_CHARS: usize = 200;

/// Normalized text of every scraped source, one block per source.
///
/// Block layout:
///
/// ```text
/// SCRAPING WEBSITE SOURCE -> nyaa.si:
/// <normalized text or ERROR SCRAPING nyaa.si: reason>
/// ----------
/// ```
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    text: String,
    succeeded: Vec<String>,
    failures: BTreeMap<String, String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the normalized text of a source that fetched successfully.
    pub fn push_block(&mut self, source: &str, body: &str) {
        self.push(source, body);
        self.succeeded.push(source.to_string());
    }

    /// Append an error block for a source that could not be fetched.
    pub fn push_failure(&mut self, source: &str, reason: &str) {
        let reason: String = reason.chars().take(MAX_REASON_CHARS).collect();
        self.push(source, &format!("{}{}: {}", ERROR_PREFIX, source, reason));
        self.failures.insert(source.to_string(), reason);
    }

    fn push(&mut self, source: &str, body: &str) {
        self.text.push_str(MARKER_PREFIX);
        self.text.push_str(source);
        self.text.push_str(":\n");
        if !body.is_empty() {
            self.text.push_str(body);
            self.text.push('\n');
        }
        self.text.push_str(DELIMITER);
        self.text.push('\n');
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Sources whose pages were fetched, in registry order.
    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    /// Sources that failed, with the bounded reason.
    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }

    /// Whether at least one source contributed page text.
    pub fn has_content(&self) -> bool {
        !self.succeeded.is_empty()
    }
}

/// Fetches every selected source concurrently and assembles the corpus.
pub struct Scraper {
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<SourceRegistry>,
    normalizer: Normalizer,
    fetch_timeout: Duration,
    deadline: Duration,
}

impl Scraper {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        registry: Arc<SourceRegistry>,
        normalizer: Normalizer,
        fetch_timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            fetcher,
            registry,
            normalizer,
            fetch_timeout,
            deadline,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Scrape `query` from the requested sources (all when `None`).
    ///
    /// Blocks stay in registry order whatever order fetches complete in.
    /// Fetches still running at the deadline are recorded as failures.
    pub async fn scrape(&self, query: &str, sources: Option<&[String]>) -> Corpus {
        let selected = self.registry.select(sources);
        let deadline = Instant::now() + self.deadline;

        info!(
            query = %query,
            sources = selected.len(),
            fetcher = self.fetcher.name(),
            "Scraping sources"
        );

        let results = join_all(
            selected
                .iter()
                .map(|source| self.scrape_source(query, source, deadline)),
        )
        .await;

        let mut corpus = Corpus::new();
        for (source, result) in selected.iter().zip(results) {
            match result {
                Ok(text) => corpus.push_block(source.name(), &text),
                Err(e) => corpus.push_failure(source.name(), &e.to_string()),
            }
        }

        debug!(
            succeeded = corpus.succeeded().len(),
            failed = corpus.failures().len(),
            chars = corpus.text().len(),
            "Corpus assembled"
        );
        corpus
    }

    async fn scrape_source(
        &self,
        query: &str,
        source: &Source,
        deadline: Instant,
    ) -> Result<String, FetchError> {
        let url = source.search_url(query);
        let fetch = timeout(
            self.fetch_timeout,
            self.fetcher.fetch(&url, source.parsing_mode()),
        );

        let result = match timeout_at(deadline, fetch).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FetchError::Timeout),
            Err(_) => Err(FetchError::DeadlineExceeded),
        };

        let status = match &result {
            Ok(_) => "success",
            Err(FetchError::DeadlineExceeded) => "deadline",
            Err(_) => "error",
        };
        metrics::SOURCE_FETCHES
            .with_label_values(&[source.name(), status])
            .inc();

        match result {
            Ok(raw) => {
                let text = self.normalizer.normalize(
                    &raw,
                    source.excluded_rules(),
                    source.parsing_mode(),
                );
                debug!(
                    source = source.name(),
                    raw_chars = raw.len(),
                    normalized_chars = text.len(),
                    "Source scraped"
                );
                Ok(text)
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "Failed to scrape source");
                Err(e)
            }
        }
    }
}
