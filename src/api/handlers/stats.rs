/// Stats-related API handlers
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::AppState;
use crate::api::types::*;
use crate::models::ReportStats;

/// Get stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<ReportStats> {
    info!("GET /api/stats");
    let stats = state.store.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
