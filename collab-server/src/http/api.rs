//! REST API handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use collab_core::SessionSummary;
use serde::{Deserialize, Serialize};

use crate::{AppState, ServerError};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of live sessions
    pub active_sessions: usize,
}

/// Health check endpoint
///
/// Returns server status, version, uptime, and live session count.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_sessions = state.registry.session_count().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_sessions,
    })
}

/// Body of a session creation request
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Identifier of the user creating the session
    pub uid: String,
}

/// POST /api/collab - Create a collaborative session
///
/// Responds `201 Created` with the new session id as plain text. The
/// session is discarded if nobody joins within the grace window.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, String), ServerError> {
    let Json(owner) = body.map_err(|e| ServerError::MalformedRequestBody(e.body_text()))?;

    let session_id = state.registry.create_session(&owner.uid).await;

    Ok((StatusCode::CREATED, session_id))
}

/// Response for listing sessions
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    /// Live sessions, oldest first
    pub sessions: Vec<SessionSummary>,
}

/// GET /api/collab/sessions - List live sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.registry.list_sessions().await,
    })
}
