//! Page fetching.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::html::{clean_html, html_to_markdown};
use super::sources::ParsingMode;
use crate::config::FetcherConfig;

/// Errors from fetching a source page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectionFailed(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Turns a URL into page text rendered for a parsing mode.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetcher name for logging.
    fn name(&self) -> &str;

    async fn fetch(&self, url: &str, mode: ParsingMode) -> Result<String, FetchError>;
}

/// `PageFetcher` over plain HTTP GET.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, mode: ParsingMode) -> Result<String, FetchError> {
        debug!(url = %url, mode = mode.as_str(), "Fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(FetchError::from_reqwest)?;
        debug!(url = %url, bytes = body.len(), "Fetched page");

        Ok(match mode {
            ParsingMode::StructuredMarkup => clean_html(&body),
            ParsingMode::FreeformText => html_to_markdown(&body),
        })
    }
}
