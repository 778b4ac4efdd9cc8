//! Discovery API integration tests.
//!
//! Drive the in-process router with mock sources and a mock model:
//! - POST /api/v1/discover outcome shape and status codes
//! - GET /api/v1/sources registry listing
//! - Health, sanitized config and metrics endpoints

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixtures, TestFixture, MOCK_MODE};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["discovery"]["max_retries"], 3);
    assert_eq!(response.body["server"]["port"], 1789);
    assert!(!response.text.contains("api_key\""));
}

#[tokio::test]
async fn test_discover_severance() {
    let fixture = TestFixture::new();
    fixture
        .fetcher
        .set_response(fixtures::MOCK_SOURCE, &fixtures::severance_page())
        .await;

    let response = fixture
        .post("/api/v1/discover", json!({ "query": "  severance  " }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["query"], "severance");
    assert_eq!(response.body["status"], "found");
    assert_eq!(response.body["attempts"], 1);

    let torrents = response.body["torrents"].as_array().unwrap();
    assert_eq!(torrents.len(), 3);
    assert_eq!(torrents[0]["filename"], "Severance S02E01 1080p WEB H264");
    assert_eq!(torrents[0]["seeders"], 1200);
    assert_eq!(torrents[0]["website_source"], fixtures::MOCK_SOURCE);
    assert_eq!(torrents[2]["filename"], "Severance S02E02 720p");

    // The freeform source had no mock response.
    assert!(response.body["source_errors"][fixtures::MOCK_FREEFORM_SOURCE]
        .as_str()
        .unwrap()
        .starts_with("connection failed"));
}

#[tokio::test]
async fn test_discover_all_sources_failed() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/discover", json!({ "query": "anything" }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "all_sources_failed");
    assert_eq!(response.body["torrents"], json!([]));
}

#[tokio::test]
async fn test_discover_source_subset() {
    let fixture = TestFixture::new();
    fixture
        .fetcher
        .set_response(fixtures::MOCK_SOURCE, &fixtures::severance_page())
        .await;

    let response = fixture
        .post(
            "/api/v1/discover",
            json!({ "query": "severance", "sources": [fixtures::MOCK_SOURCE] }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "found");
    assert!(response.body.get("source_errors").is_none());
    assert_eq!(fixture.fetcher.fetch_count().await, 1);
}

#[tokio::test]
async fn test_discover_with_model() {
    let fixture = TestFixture::new();
    fixture
        .fetcher
        .set_response(fixtures::MOCK_FREEFORM_SOURCE, &fixtures::freeform_listing())
        .await;
    fixture
        .llm
        .push_response(
            json!({
                "torrents": [fixtures::candidate(
                    "Frieren 01 1080p",
                    fixtures::MOCK_FREEFORM_SOURCE,
                    150,
                    20
                )]
            })
            .to_string(),
        )
        .await;

    let response = fixture
        .post(
            "/api/v1/discover",
            json!({ "query": "frieren", "extraction_mode": MOCK_MODE }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "found");
    assert_eq!(response.body["torrents"][0]["filename"], "Frieren 01 1080p");
    assert_eq!(response.body["torrents"][0]["size"], "1.4 GB");
    assert_eq!(fixture.llm.call_count().await, 1);
}

#[tokio::test]
async fn test_discover_unknown_mode() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/discover",
            json!({ "query": "severance", "extraction_mode": "gpt-9" }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "extractor_unavailable");
    assert_eq!(response.body["attempts"], 0);
    assert_eq!(fixture.fetcher.fetch_count().await, 0);
}

#[tokio::test]
async fn test_discover_empty_query_rejected() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/discover", json!({ "query": "   " }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "query must not be empty");
    assert_eq!(fixture.fetcher.fetch_count().await, 0);
}

#[tokio::test]
async fn test_discover_malformed_body() {
    let fixture = TestFixture::new();

    let response = fixture.post_raw("/api/v1/discover", "{not json").await;

    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn test_list_sources() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/sources").await;

    assert_status!(response, StatusCode::OK);
    let sources = response.body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["name"], fixtures::MOCK_SOURCE);
    assert_eq!(sources[0]["parsing_mode"], "structured_markup");
    assert_eq!(sources[1]["name"], fixtures::MOCK_FREEFORM_SOURCE);
    assert_eq!(sources[1]["excluded_rules"], json!(["local_links"]));
    assert_eq!(response.body["extraction_modes"], json!([MOCK_MODE]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;

    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("scout_http_requests_total"));
    assert!(response.text.contains("/api/v1/health"));
}
