//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use collab_core::SessionError;
use thiserror::Error;

/// Errors that can occur in the collab server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Request body or query could not be decoded
    #[error("{0}")]
    MalformedRequestBody(String),

    /// Session not found
    #[error("provided UUID is invalid.")]
    SessionNotFound(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => ServerError::SessionNotFound(id),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::MalformedRequestBody(_) | ServerError::SessionNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Bind { .. } | ServerError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
