/// API request handlers
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Json;

use crate::api::types::ApiResponse;
use crate::api::types::HealthResponse;
use crate::api::SearchCache;
use crate::database::EndBoundary;
use crate::database::RecordStore;
use crate::rag::AnalysisService;

pub mod analysis;
pub mod reports;
pub mod search;
pub mod stats;

pub use analysis::*;
pub use reports::*;
pub use search::*;
pub use stats::*;

/// Header naming the caller's session for the last-search cache
pub const SESSION_HEADER: &str = "x-session-id";
const DEFAULT_SESSION: &str = "default";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub analysis: Arc<AnalysisService>,
    /// Last search result per session, reused by analyze requests
    pub last_search: Arc<SearchCache>,
    pub end_boundary: EndBoundary,
}

impl AppState {
    pub fn new(
        store: Arc<RecordStore>,
        analysis: Arc<AnalysisService>,
        end_boundary: EndBoundary,
        max_cached_searches: usize,
    ) -> Self {
        Self {
            store,
            analysis,
            last_search: Arc::new(SearchCache::new(max_cached_searches)),
            end_boundary,
        }
    }
}

pub(crate) fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
