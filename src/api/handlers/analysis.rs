/// Analysis and summary handlers
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::info;

use super::session_id;
use super::AppState;
use crate::api::types::*;
use crate::rag::AnalysisOutcome;
use crate::rag::AnalysisRequest;
use crate::LabRagError;

/// Run a retrieval-backed analysis (POST /api/analyze)
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalysisOutcome> {
    info!("POST /api/analyze");

    let mut analysis = if request.use_last_search {
        let session = session_id(&headers);
        let reports = state
            .last_search
            .get(&session)
            .ok_or_else(|| {
                LabRagError::InvalidInput(format!("No previous search for session {session}"))
            })?;
        AnalysisRequest::provided(reports)
    } else if let Some(filter) = &request.filter {
        AnalysisRequest::filtered(filter.to_query(state.end_boundary)?)
    } else {
        AnalysisRequest::all()
    };

    if let Some(question) = request.question {
        analysis = analysis.with_question(question);
    }
    if let Some(top_k) = request.top_k {
        analysis = analysis.with_top_k(top_k);
    }

    let outcome = state.analysis.analyze(analysis).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Summarize the newest reports (POST /api/summarize)
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> ApiResult<AnalysisOutcome> {
    info!("POST /api/summarize");
    let outcome = state.analysis.summarize(request.limit).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
