//! WebSocket join handler and transport adapter

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use collab_core::{Connection, ConnectionError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{AppState, ServerError};

/// Participant identity supplied when joining
///
/// Carried in the query string: browser WebSocket handshakes cannot send a
/// request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Identifier of the joining participant
    pub uid: String,
}

/// GET /api/collab/{uuid}/join - Join a session over WebSocket
///
/// Rejects with `400 Bad Request` before upgrading if the participant id is
/// missing or the session does not exist.
pub async fn join_session(
    Path(session_id): Path<String>,
    query: Result<Query<JoinRequest>, QueryRejection>,
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ServerError> {
    let Query(body) = query.map_err(|e| ServerError::MalformedRequestBody(e.body_text()))?;

    if let Err(e) = state.registry.lookup(&session_id).await {
        debug!(session_id = %session_id, "Join refused for unknown session");
        return Err(e.into());
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws.on_upgrade(move |socket| async move {
        info!(session_id = %session_id, participant_id = %body.uid, "WebSocket client connected");
        // The session may have expired between validation and upgrade;
        // admission closes the socket in that case.
        match state
            .admission
            .run(&session_id, &body.uid, WebSocketConnection::new(socket))
            .await
        {
            Ok(reason) => {
                debug!(
                    session_id = %session_id,
                    participant_id = %body.uid,
                    ?reason,
                    "WebSocket client finished"
                );
            }
            Err(e) => {
                debug!(
                    session_id = %session_id,
                    participant_id = %body.uid,
                    "Join rejected after upgrade: {}", e
                );
            }
        }
    }))
}

/// Upper bound on delivering the close frame to a peer that stopped reading
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`Connection`] over an axum WebSocket
pub struct WebSocketConnection {
    socket: WebSocket,
}

impl WebSocketConnection {
    /// Wrap an upgraded socket
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Result<Option<String>, ConnectionError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("WebSocket client sent close frame");
                    return Ok(None);
                }
                Some(Ok(_)) => {
                    // Binary and pong frames carry nothing; pings are answered by axum
                }
                Some(Err(e)) => return Err(ConnectionError::Read(e.to_string())),
            }
        }
    }

    async fn send(&mut self, message: String) -> Result<(), ConnectionError> {
        self.socket
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| ConnectionError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.socket.send(Message::Close(None))).await {
            Ok(Ok(())) => {}
            // Expected when the peer already went away
            Ok(Err(e)) => debug!("Failed to send close frame: {}", e),
            Err(_) => debug!("Peer not reading, dropping socket without close frame"),
        }
    }
}
