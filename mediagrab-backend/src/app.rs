use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

// Submissions are small JSON bodies; anything larger is a mistake.
const BODY_LIMIT: usize = 64 * 1024;

/// Build the primary axum router with the provided shared application state.
pub fn build_router(state: Arc<AppState>, cors: Option<CorsLayer>) -> Router {
    let router = Router::new()
        .route("/jobs", post(handlers::jobs::create::create))
        .route("/jobs/{jobId}", get(handlers::jobs::get::get))
        .route("/download/{jobId}", get(handlers::download::serve::serve))
        .route("/queue/info", get(handlers::queue::info::info))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state));

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Translate CORS configuration into a tower-http layer. Returns `None`
/// when no origins are configured so the layer is skipped entirely.
pub fn cors_layer(cfg: &mediagrab_config::CorsConfig) -> Option<CorsLayer> {
    if cfg.allow_all_origins {
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        );
    }
    if cfg.allowed_origins.is_empty() {
        return None;
    }
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
    )
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
