//! Discovery API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use scout_core::{DiscoveryOutcome, DiscoveryRequest, Source};

use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<Source>,
    /// Extraction modes bound to a configured model.
    pub extraction_modes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/discover
///
/// Scrape the selected sources and extract ranked torrent records.
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DiscoveryRequest>,
) -> Result<Json<DiscoveryOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query must not be empty".to_string(),
            }),
        ));
    }

    let request = DiscoveryRequest {
        query: query.to_string(),
        ..body
    };
    let outcome = state.discovery().discover_with_outcome(&request).await;

    info!(
        id = %outcome.id,
        status = outcome.status.as_str(),
        results = outcome.torrents.len(),
        "Discovery request served"
    );

    Ok(Json(outcome))
}

/// GET /api/v1/sources
///
/// List the source registry in scrape order.
pub async fn list_sources(State(state): State<Arc<AppState>>) -> Json<SourcesResponse> {
    let discovery = state.discovery();
    Json(SourcesResponse {
        sources: discovery.registry().iter().cloned().collect(),
        extraction_modes: discovery
            .extraction_modes()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}
