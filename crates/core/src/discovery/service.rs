//! Discovery service: scrape once, then extract and rank with bounded retries.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::extractor::Extractor;
use super::fetcher::{HttpFetcher, PageFetcher};
use super::model_assisted::ModelAssistedExtractor;
use super::normalizer::Normalizer;
use super::ranker::finalize;
use super::scraper::{Corpus, Scraper};
use super::sources::SourceRegistry;
use super::tabular::TabularExtractor;
use super::types::{DiscoveryOutcome, DiscoveryRequest, DiscoveryStatus, TorrentRecord};
use crate::config::{Config, ConfigError, DiscoveryConfig};
use crate::llm::create_llm_client;
use crate::metrics;

/// Entry point of the discovery pipeline.
///
/// Holds only read-only state, so one instance serves concurrent calls.
pub struct DiscoveryService {
    registry: Arc<SourceRegistry>,
    scraper: Scraper,
    default_extractor: Arc<dyn Extractor>,
    model_extractors: BTreeMap<String, Arc<dyn Extractor>>,
    min_peers: u64,
    max_items: usize,
    max_retries: u32,
}

impl DiscoveryService {
    /// Create a service with tabular extraction only.
    ///
    /// Model-assisted extractors are registered with `with_model_extractor`.
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn PageFetcher>,
        config: &DiscoveryConfig,
        fetch_timeout: Duration,
    ) -> Self {
        let registry = Arc::new(registry);
        let scraper = Scraper::new(
            fetcher,
            Arc::clone(&registry),
            Normalizer::new(config.max_chars),
            fetch_timeout,
            Duration::from_secs(config.deadline_secs),
        );

        Self {
            registry,
            scraper,
            default_extractor: Arc::new(TabularExtractor::new()),
            model_extractors: BTreeMap::new(),
            min_peers: config.min_peers,
            max_items: config.max_items,
            max_retries: config.max_retries,
        }
    }

    /// Build the service with the HTTP fetcher and one model-assisted
    /// extractor per configured `[llm.<name>]` entry.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let fetcher = HttpFetcher::new(&config.fetcher)
            .map_err(|e| ConfigError::ValidationError(format!("fetcher: {}", e)))?;

        let mut service = Self::new(
            SourceRegistry::from_config(&config.discovery),
            Arc::new(fetcher),
            &config.discovery,
            Duration::from_secs(config.fetcher.timeout_secs as u64),
        );

        for (name, llm) in &config.llm {
            let client = create_llm_client(llm)?;
            info!(
                mode = %name,
                provider = client.provider(),
                model = client.model(),
                "Registered model-assisted extraction"
            );
            service = service.with_model_extractor(
                name.clone(),
                Arc::new(ModelAssistedExtractor::from_config(client, llm)),
            );
        }

        Ok(service)
    }

    /// Replace the extractor used when no extraction mode is requested.
    pub fn with_default_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.default_extractor = extractor;
        self
    }

    /// Bind an extractor to an extraction-mode identifier.
    pub fn with_model_extractor(
        mut self,
        mode: impl Into<String>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        self.model_extractors.insert(mode.into(), extractor);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Extraction-mode identifiers that have an extractor bound.
    pub fn extraction_modes(&self) -> Vec<&str> {
        self.model_extractors.keys().map(String::as_str).collect()
    }

    /// Discover torrents for `query`. Returns an empty list on total failure.
    pub async fn discover(
        &self,
        query: &str,
        sources: Option<Vec<String>>,
        extraction_mode: Option<String>,
    ) -> Vec<TorrentRecord> {
        let request = DiscoveryRequest {
            query: query.to_string(),
            sources,
            extraction_mode,
        };
        self.discover_with_outcome(&request).await.torrents
    }

    /// Discover torrents and report how the call ended.
    pub async fn discover_with_outcome(&self, request: &DiscoveryRequest) -> DiscoveryOutcome {
        let id = Uuid::new_v4();
        let span = info_span!("discovery", id = %id, query = %request.query);
        self.run(id, request).instrument(span).await
    }

    async fn run(&self, id: Uuid, request: &DiscoveryRequest) -> DiscoveryOutcome {
        let started_at = Utc::now();
        let started = Instant::now();

        let extractor = match request.extraction_mode.as_deref() {
            None => Arc::clone(&self.default_extractor),
            Some(mode) => match self.model_extractors.get(mode) {
                Some(extractor) => Arc::clone(extractor),
                None => {
                    warn!(mode = %mode, "No extractor configured for extraction mode");
                    let outcome = DiscoveryOutcome {
                        id,
                        query: request.query.clone(),
                        torrents: Vec::new(),
                        status: DiscoveryStatus::ExtractorUnavailable,
                        attempts: 0,
                        duration_ms: started.elapsed().as_millis() as u64,
                        started_at,
                        source_errors: BTreeMap::new(),
                    };
                    return self.conclude(outcome, started);
                }
            },
        };

        let corpus = self
            .scraper
            .scrape(&request.query, request.sources.as_deref())
            .await;

        let (torrents, status, attempts) = self
            .extract_with_retries(extractor.as_ref(), &corpus)
            .await;

        let outcome = DiscoveryOutcome {
            id,
            query: request.query.clone(),
            torrents,
            status,
            attempts,
            duration_ms: started.elapsed().as_millis() as u64,
            started_at,
            source_errors: corpus.failures().clone(),
        };
        self.conclude(outcome, started)
    }

    /// Extract and finalize until success or the retry budget is spent.
    /// The corpus is never re-fetched.
    async fn extract_with_retries(
        &self,
        extractor: &dyn Extractor,
        corpus: &Corpus,
    ) -> (Vec<TorrentRecord>, DiscoveryStatus, u32) {
        let mut attempts = 0;

        loop {
            attempts += 1;
            match extractor.extract(corpus).await {
                Ok(candidates) => {
                    metrics::EXTRACTION_ATTEMPTS
                        .with_label_values(&[extractor.name(), "success"])
                        .inc();

                    let found = candidates.len();
                    let torrents =
                        finalize(&candidates, &self.registry, self.min_peers, self.max_items);
                    info!(
                        strategy = extractor.name(),
                        attempt = attempts,
                        candidates = found,
                        kept = torrents.len(),
                        "Extraction succeeded"
                    );

                    let status = if !torrents.is_empty() {
                        DiscoveryStatus::Found
                    } else if corpus.has_content() {
                        DiscoveryStatus::NoMatches
                    } else {
                        DiscoveryStatus::AllSourcesFailed
                    };
                    return (torrents, status, attempts);
                }
                Err(e) => {
                    metrics::EXTRACTION_ATTEMPTS
                        .with_label_values(&[extractor.name(), "error"])
                        .inc();
                    warn!(
                        strategy = extractor.name(),
                        attempt = attempts,
                        max_retries = self.max_retries,
                        error = %e,
                        "Extraction failed"
                    );

                    if attempts >= self.max_retries {
                        return (Vec::new(), DiscoveryStatus::ExtractionFailed, attempts);
                    }
                }
            }
        }
    }

    fn conclude(&self, outcome: DiscoveryOutcome, started: Instant) -> DiscoveryOutcome {
        let status = outcome.status.as_str();
        metrics::DISCOVERY_CALLS.with_label_values(&[status]).inc();
        metrics::DISCOVERY_DURATION
            .with_label_values(&[status])
            .observe(started.elapsed().as_secs_f64());
        metrics::RECORDS_RETURNED.observe(outcome.torrents.len() as f64);

        info!(
            status,
            torrents = outcome.torrents.len(),
            attempts = outcome.attempts,
            failed_sources = outcome.source_errors.len(),
            duration_ms = outcome.duration_ms,
            "Discovery finished"
        );
        outcome
    }
}
