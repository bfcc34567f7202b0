//! API Module
//!
//! HTTP API layer for the build service.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod build;
pub mod error;
pub mod health;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Build endpoints
        .route("/builds", get(build::list_builds).post(build::create_build))
        .route("/builds/{id}", get(build::get_build).put(build::update_build))
        .route(
            "/builds/{id}/logs",
            get(build::get_build_logs).post(build::append_build_logs),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
