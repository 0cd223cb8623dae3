/// Report CRUD handlers
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::AppState;
use crate::api::types::*;
use crate::models::NewReport;
use crate::models::Report;
use crate::models::ReportUpdate;
use crate::LabRagError;

/// Create a report (POST /api/reports)
pub async fn create_report(
    State(state): State<AppState>,
    Json(report): Json<NewReport>,
) -> ApiResult<Report> {
    info!("POST /api/reports");
    let created = state.store.insert(report).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// List every report (GET /api/reports)
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ListReportsQuery>,
) -> ApiResult<SearchResponse> {
    info!("GET /api/reports");
    let reports = state.store.list_all(params.order).await?;
    Ok(Json(ApiResponse::success(SearchResponse::new(reports))))
}

/// Get one report (GET /api/reports/:id)
pub async fn get_report(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Report> {
    info!("GET /api/reports/{}", id);
    let report = state.store.get(id).await?.ok_or(LabRagError::NotFound(id))?;
    Ok(Json(ApiResponse::success(report)))
}

/// Change some fields of a report (PATCH /api/reports/:id)
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<ReportUpdate>,
) -> ApiResult<Report> {
    info!("PATCH /api/reports/{}", id);
    let updated = state.store.update(id, update).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Delete a report (DELETE /api/reports/:id)
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DeleteResponse> {
    info!("DELETE /api/reports/{}", id);
    state.store.delete(id).await?;
    Ok(Json(ApiResponse::success(DeleteResponse { id, deleted: true })))
}
