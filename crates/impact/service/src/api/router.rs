//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        // Volunteers
        .route("/volunteers/:id/ranking", get(handlers::rank_causes))
        .route("/volunteers/:id/pending", get(handlers::list_pending))
        .route("/volunteers/:id/impact", get(handlers::get_impact))
        // Matches
        .route("/matches", post(handlers::create_match))
        .route("/matches/:id", get(handlers::get_match))
        .route("/matches/:id/verify", post(handlers::verify_match))
        .route("/matches/:id/deny", post(handlers::deny_match))
        // Audit
        .route("/verifications/attempts", get(handlers::list_attempts));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
