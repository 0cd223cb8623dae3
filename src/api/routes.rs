//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers;
use super::handlers::AppState;

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Report endpoints
        .route(
            "/reports",
            get(handlers::list_reports).post(handlers::create_report),
        )
        .route(
            "/reports/:id",
            get(handlers::get_report)
                .patch(handlers::update_report)
                .delete(handlers::delete_report),
        )
        // Search
        .route("/search", post(handlers::search_reports))
        // Analysis endpoints
        .route("/analyze", post(handlers::analyze))
        .route("/summarize", post(handlers::summarize))
        // Statistics
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}
