//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Submission endpoints are meant to be called from third-party web
    // pages, so they carry a wildcard CORS policy. Nothing else does.
    let submission_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let submission_routes = Router::new()
        .route("/api/videos/submit", post(handlers::submit_videos))
        .route("/api/playlists/submit", post(handlers::submit_playlists))
        .route("/api/channels/submit", post(handlers::submit_channels))
        .layer(submission_cors);

    Router::new()
        .route("/", get(handlers::landing_page))
        .route("/api/stats", get(handlers::get_stats))
        // Worker lifecycle
        .route("/api/workers", get(handlers::list_workers))
        .route("/api/workers/create", post(handlers::create_worker))
        // Coordination protocol
        .route("/api/batches", post(handlers::request_batch))
        .route("/api/batches/{batch_id}", post(handlers::refetch_batch))
        .route("/api/commit", post(handlers::commit_batch))
        .route("/api/finalize", post(handlers::finalize_batch))
        .merge(submission_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
