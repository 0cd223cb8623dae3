/// Search handler
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::debug;
use tracing::info;

use super::session_id;
use super::AppState;
use crate::api::types::*;

/// Filtered report search (POST /api/search)
///
/// The result is remembered per session so a following analyze request can
/// reuse it.
pub async fn search_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    info!("POST /api/search");

    let query = request.to_query(state.end_boundary)?;
    let reports = state.store.search(&query).await?;

    let session = session_id(&headers);
    debug!("Caching {} reports for session {}", reports.len(), session);
    state.last_search.insert(session, reports.clone());

    Ok(Json(ApiResponse::success(SearchResponse::new(reports))))
}
