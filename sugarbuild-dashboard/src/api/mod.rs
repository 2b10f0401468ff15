//! API Module
//!
//! HTTP API layer for the dashboard.
//! Each submodule handles endpoints for a specific domain.

pub mod dump;
pub mod error;
pub mod health;

use axum::{
    Router,
    response::Redirect,
    routing::get,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::DashboardState;

/// Create the main router with all endpoints
pub fn create_router(state: Arc<DashboardState>) -> Router {
    let stylesheets = ServeDir::new(&state.static_dir);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Dump endpoints
        .route("/", get(|| async { Redirect::to("/build") }))
        .route("/build", get(dump::index))
        .route("/build/dumps", get(dump::list_dumps))
        .route("/build/data/{branch}", get(dump::get_dump))
        .nest_service("/build/css", stylesheets)
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
