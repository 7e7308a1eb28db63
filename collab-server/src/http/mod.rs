//! HTTP server module

mod api;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::ws::join_session;

pub use api::{CreateSessionRequest, HealthResponse, SessionListResponse};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/collab", post(api::create_session))
        .route("/api/collab/sessions", get(api::list_sessions))
        .route("/api/collab/:uuid/join", get(join_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
