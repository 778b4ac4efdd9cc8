//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the in-process router
//! with a mock fetcher and a mock language model injected, so the HTTP
//! surface can be exercised without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use scout_core::config::DiscoveryConfig;
use scout_core::discovery::ModelAssistedExtractor;
use scout_core::testing::{MockFetcher, MockLlmClient};
use scout_core::{Config, DiscoveryService};

/// Re-export fixtures for test convenience
pub use scout_core::testing::fixtures;

/// Extraction mode bound to the mock language model.
pub const MOCK_MODE: &str = "mock-llm";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_discover() {
///     let fixture = TestFixture::new();
///     fixture.fetcher.set_response(fixtures::MOCK_SOURCE, &fixtures::severance_page()).await;
///
///     let response = fixture.post("/api/v1/discover", json!({ "query": "severance" })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - configure page bodies per source
    pub fetcher: Arc<MockFetcher>,
    /// Mock language model - queue completions
    pub llm: Arc<MockLlmClient>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture over both mock sources with default settings.
    pub fn new() -> Self {
        Self::with_discovery(DiscoveryConfig::default())
    }

    /// Create a fixture with custom discovery settings.
    pub fn with_discovery(discovery: DiscoveryConfig) -> Self {
        let fetcher = Arc::new(MockFetcher::new());
        let llm = Arc::new(MockLlmClient::new());

        let config = Config {
            discovery: discovery.clone(),
            ..Default::default()
        };

        let service = DiscoveryService::new(
            fixtures::mixed_registry(),
            Arc::clone(&fetcher) as Arc<dyn scout_core::discovery::PageFetcher>,
            &discovery,
            Duration::from_secs(5),
        )
        .with_model_extractor(
            MOCK_MODE,
            Arc::new(ModelAssistedExtractor::new(
                Arc::clone(&llm) as Arc<dyn scout_core::LlmClient>
            )),
        );

        let state = Arc::new(scout_server::state::AppState::new(
            config,
            Arc::new(service),
        ));
        let router = scout_server::api::create_router(state);

        Self {
            router,
            fetcher,
            llm,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, Body::empty(), None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let bytes = serde_json::to_vec(&body).unwrap();
        self.request("POST", path, Body::from(bytes), Some("application/json"))
            .await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request(
            "POST",
            path,
            Body::from(body.to_string()),
            Some("application/json"),
        )
        .await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Body,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            request_builder = request_builder.header("Content-Type", content_type);
        }
        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
