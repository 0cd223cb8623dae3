//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::database::RecordStore;
use crate::rag::AnalysisService;
use crate::Result;

/// Build the full application router around a prepared state
pub fn build_app(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("🚀 Starting LabRAG API server...");

    // Initialize services
    let store = Arc::new(RecordStore::from_config(config)?);
    let analysis = Arc::new(AnalysisService::with_source(config, store.clone())?);
    let state = AppState::new(
        store,
        analysis,
        config.end_boundary(),
        config.server.max_cached_searches,
    );

    let app = build_app(state, enable_cors);

    // Start server
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("📋 RESTful API available at http://{}/api", addr);
    info!("");
    info!("Endpoints:");
    info!("  GET    /api/health");
    info!("  GET    /api/reports");
    info!("  POST   /api/reports");
    info!("  GET    /api/reports/:id");
    info!("  PATCH  /api/reports/:id");
    info!("  DELETE /api/reports/:id");
    info!("  POST   /api/search");
    info!("  POST   /api/analyze");
    info!("  POST   /api/summarize");
    info!("  GET    /api/stats");

    axum::serve(listener, app).await?;

    Ok(())
}
