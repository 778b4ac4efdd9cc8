//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::discovery::{FetchError, PageFetcher, ParsingMode};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// The URL that was fetched.
    pub url: String,
    /// The rendering mode requested.
    pub mode: ParsingMode,
    /// When the fetch was made.
    pub timestamp: Instant,
}

/// Mock implementation of the PageFetcher trait.
///
/// Responses are keyed by a URL fragment: the first configured fragment
/// contained in the requested URL wins. Unmatched URLs fail with a
/// connection error.
///
/// # Example
///
/// ```rust,ignore
/// use scout_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_response("nyaa.si", "| [Anime] | ... |").await;
/// fetcher.set_delay("thepiratebay.org", Duration::from_secs(5)).await;
///
/// let page = fetcher.fetch("https://nyaa.si/?q=x", ParsingMode::FreeformText).await?;
/// assert_eq!(fetcher.fetch_count().await, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    /// Configured results by URL fragment, in insertion order.
    routes: Arc<RwLock<Vec<(String, Result<String, FetchError>)>>>,
    /// Simulated latency by URL fragment.
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    /// Recorded fetches.
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl MockFetcher {
    /// Create a new mock fetcher with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for URLs containing `fragment`.
    pub async fn set_response(&self, fragment: &str, body: &str) {
        self.set_route(fragment, Ok(body.to_string())).await;
    }

    /// Fail URLs containing `fragment` with `error`.
    pub async fn set_error(&self, fragment: &str, error: FetchError) {
        self.set_route(fragment, Err(error)).await;
    }

    async fn set_route(&self, fragment: &str, result: Result<String, FetchError>) {
        let mut routes = self.routes.write().await;
        match routes.iter_mut().find(|(f, _)| f.as_str() == fragment) {
            Some(route) => route.1 = result,
            None => routes.push((fragment.to_string(), result)),
        }
    }

    /// Delay responses for URLs containing `fragment`.
    pub async fn set_delay(&self, fragment: &str, delay: Duration) {
        self.delays
            .write()
            .await
            .insert(fragment.to_string(), delay);
    }

    /// Get recorded fetches.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Get the URLs fetched so far, in call order.
    pub async fn recorded_urls(&self) -> Vec<String> {
        self.fetches
            .read()
            .await
            .iter()
            .map(|f| f.url.clone())
            .collect()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, mode: ParsingMode) -> Result<String, FetchError> {
        self.fetches.write().await.push(RecordedFetch {
            url: url.to_string(),
            mode,
            timestamp: Instant::now(),
        });

        let delay = self
            .delays
            .read()
            .await
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.routes
            .read()
            .await
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| {
                Err(FetchError::ConnectionFailed(format!(
                    "no mock response for {}",
                    url
                )))
            })
    }
}
