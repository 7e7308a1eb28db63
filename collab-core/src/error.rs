//! Error types for collab-core

use thiserror::Error;

/// Errors related to session management
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Transport faults local to one participant's connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Failed to read from stream: {0}")]
    Read(String),

    #[error("Failed to write to stream: {0}")]
    Write(String),
}
