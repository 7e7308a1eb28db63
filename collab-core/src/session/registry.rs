//! SessionRegistry: the process-wide table of live sessions
//!
//! Every mutation and every emptiness check takes the table's write lock,
//! so join, leave and expiry are atomic with respect to each other. The lock
//! is never held across transport I/O: relay only clones the destination
//! senders and queues with `try_send`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SessionError;

use super::expiry::{DEFAULT_GRACE_WINDOW, ExpirySupervisor};
use super::relay::{RelayOutcome, RelayPolicy};
use super::state::{ParticipantHandle, ParticipantId, Session, SessionId, SessionSummary};

/// Default number of messages buffered per participant
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Registry tuning
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long an empty session survives after creation
    pub grace_window: Duration,
    /// Who receives relayed messages
    pub relay_policy: RelayPolicy,
    /// Messages buffered per participant before new ones are dropped
    pub outbound_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
            relay_policy: RelayPolicy::default(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Proof of a successful join, needed to detach that exact connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub connection_id: Uuid,
}

/// Manages every live collaborative session
///
/// SessionRegistry provides:
/// - Session creation with unique IDs and a grace-window expiry timer
/// - Join/leave of participants
/// - Message relay inside a session
/// - Explicit close and shutdown
pub struct SessionRegistry {
    /// Live sessions indexed by ID
    sessions: RwLock<HashMap<SessionId, Session>>,
    /// Grace-window timers
    expiry: ExpirySupervisor,
    config: RegistryConfig,
    /// Handed to expiry timers
    this: Weak<SessionRegistry>,
}

impl SessionRegistry {
    /// Create a new registry
    pub fn new(config: RegistryConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            sessions: RwLock::new(HashMap::new()),
            expiry: ExpirySupervisor::new(config.grace_window),
            config,
            this: this.clone(),
        })
    }

    /// Registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The expiry supervisor owning this registry's timers
    pub fn expiry(&self) -> &ExpirySupervisor {
        &self.expiry
    }

    /// Create an empty session owned by `owner`
    ///
    /// Returns the session ID. The session is discarded if it is still
    /// empty when the grace window elapses.
    pub async fn create_session(&self, owner: &str) -> SessionId {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Session::new(id.clone(), owner));

        self.expiry.schedule(self.this.clone(), id.clone()).await;

        info!(session_id = %id, owner = %owner, "Session created");
        id
    }

    /// Whether a session is live
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Snapshot of a session
    pub async fn lookup(&self, id: &str) -> Result<SessionSummary, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(session.summary())
    }

    /// Attached participant ids of a session, sorted
    pub async fn participants(&self, id: &str) -> Result<Vec<ParticipantId>, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(session.participant_ids())
    }

    /// Attach a participant's handle to a session
    ///
    /// A participant id that is already attached has its previous connection
    /// closed and replaced. Fails without mutating anything if the session
    /// does not exist.
    pub async fn join(
        &self,
        session_id: &str,
        participant_id: &str,
        handle: ParticipantHandle,
    ) -> Result<Attachment, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let connection_id = handle.connection_id();
        if let Some(previous) = session.attach(participant_id, handle) {
            info!(
                session_id = %session_id,
                participant_id = %participant_id,
                replaced = %previous.connection_id(),
                "Replaced existing connection"
            );
        }

        info!(
            session_id = %session_id,
            participant_id = %participant_id,
            participants = session.participant_count(),
            "Participant joined"
        );

        Ok(Attachment {
            session_id: session_id.to_string(),
            participant_id: participant_id.to_string(),
            connection_id,
        })
    }

    /// Remove a participant from a session
    ///
    /// No-op if the participant or the session is already gone.
    pub async fn leave(&self, session_id: &str, participant_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id)
            && session.remove(participant_id).is_some()
        {
            info!(
                session_id = %session_id,
                participant_id = %participant_id,
                "Participant left"
            );
        }
    }

    /// Remove the connection described by `attachment`
    ///
    /// Leaves the participant alone if a newer connection replaced it.
    pub async fn detach(&self, attachment: &Attachment) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions
            .get_mut(&attachment.session_id)
            .is_some_and(|session| {
                session.remove_connection(&attachment.participant_id, attachment.connection_id)
            });

        if removed {
            info!(
                session_id = %attachment.session_id,
                participant_id = %attachment.participant_id,
                "Participant left"
            );
        }
        removed
    }

    /// Delete the session if nobody is attached
    ///
    /// Returns true if the session was removed.
    pub async fn expire_if_empty(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(session) if session.is_empty() => {
                sessions.remove(id);
                info!(session_id = %id, "Session expired with no participants");
                true
            }
            Some(session) => {
                debug!(
                    session_id = %id,
                    participants = session.participant_count(),
                    "Session populated at grace expiry, retained"
                );
                false
            }
            None => false,
        }
    }

    /// Relay a message from one participant according to the relay policy
    pub async fn relay(
        &self,
        session_id: &str,
        from: &str,
        message: &str,
    ) -> Result<RelayOutcome, SessionError> {
        let destinations = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
            session.destinations(from, self.config.relay_policy)
        };

        let mut outcome = RelayOutcome::default();
        for (participant_id, outbound) in destinations {
            match outbound.try_send(message.to_string()) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session_id = %session_id,
                        participant_id = %participant_id,
                        "Outbound queue full, dropping message"
                    );
                    outcome.dropped.push(participant_id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(
                        session_id = %session_id,
                        participant_id = %participant_id,
                        "Destination already disconnected"
                    );
                    outcome.disconnected.push(participant_id);
                }
            }
        }

        debug!(
            session_id = %session_id,
            from = %from,
            delivered = outcome.delivered,
            "Relayed message"
        );
        Ok(outcome)
    }

    /// Remove a session, disconnecting everyone in it
    pub async fn close_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        let Some(mut session) = removed else {
            return false;
        };

        let disconnected = session.close_all();
        self.expiry.cancel(id).await;
        info!(session_id = %id, disconnected, "Session closed");
        true
    }

    /// Close every session and cancel every timer
    pub async fn shutdown(&self) {
        let sessions: Vec<Session> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        let count = sessions.len();
        for mut session in sessions {
            session.close_all();
        }
        self.expiry.cancel_all().await;
        info!(sessions = count, "Session registry shut down");
    }

    /// List all live sessions, oldest first
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .map(Session::summary)
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        summaries
    }

    /// Get the number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
