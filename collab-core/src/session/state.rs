//! Session struct and participant handles
//!
//! A Session is a named room holding the handles of every attached
//! participant. The relay side of each handle lives in the participant's
//! relay loop; the Session only keeps what it needs to deliver messages
//! and to force a disconnect.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::relay::RelayPolicy;

/// Opaque identifier of a live session
pub type SessionId = String;

/// Caller-supplied identifier of a participant within one session
pub type ParticipantId = String;

/// Session-side handle for one attached connection
#[derive(Debug, Clone)]
pub struct ParticipantHandle {
    connection_id: Uuid,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    joined_at: DateTime<Utc>,
}

/// Relay-side counterpart of a [`ParticipantHandle`]
#[derive(Debug)]
pub struct ParticipantInbox {
    /// Messages routed to this participant by the session
    pub messages: mpsc::Receiver<String>,
    /// Cancelled when the session forces this participant out
    pub cancel: CancellationToken,
}

/// Create a linked handle/inbox pair with the given outbound buffer size
pub fn participant_channel(buffer: usize) -> (ParticipantHandle, ParticipantInbox) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let cancel = CancellationToken::new();

    let handle = ParticipantHandle {
        connection_id: Uuid::new_v4(),
        outbound: tx,
        cancel: cancel.clone(),
        joined_at: Utc::now(),
    };
    let inbox = ParticipantInbox {
        messages: rx,
        cancel,
    };
    (handle, inbox)
}

impl ParticipantHandle {
    /// Unique id of this attachment
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// When the participant joined
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// Sender feeding the participant's relay loop
    pub fn outbound(&self) -> &mpsc::Sender<String> {
        &self.outbound
    }

    /// Force the participant's relay loop to exit and close its stream
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    /// Whether a disconnect was requested
    pub fn is_disconnected(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Read-only snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID
    pub id: SessionId,
    /// Identifier of the user who created the session
    pub owner: String,
    /// Currently attached participants, sorted
    pub participants: Vec<ParticipantId>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

/// A collaborative room
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    owner: String,
    created_at: DateTime<Utc>,
    connections: HashMap<ParticipantId, ParticipantHandle>,
}

impl Session {
    /// Create an empty session
    pub fn new(id: impl Into<SessionId>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            created_at: Utc::now(),
            connections: HashMap::new(),
        }
    }

    /// Get the session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the owner identifier supplied at creation
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// When the session was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when nobody is attached
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of attached participants
    pub fn participant_count(&self) -> usize {
        self.connections.len()
    }

    /// Attached participant ids, sorted
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.connections.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Look up a participant's handle
    pub fn participant(&self, participant_id: &str) -> Option<&ParticipantHandle> {
        self.connections.get(participant_id)
    }

    /// Attach a handle, closing and returning any handle it replaces
    pub fn attach(
        &mut self,
        participant_id: impl Into<ParticipantId>,
        handle: ParticipantHandle,
    ) -> Option<ParticipantHandle> {
        let participant_id = participant_id.into();
        let previous = self.connections.remove(&participant_id);
        if let Some(previous) = &previous {
            previous.disconnect();
        }
        self.connections.insert(participant_id, handle);
        previous
    }

    /// Remove a participant regardless of which connection it holds
    pub fn remove(&mut self, participant_id: &str) -> Option<ParticipantHandle> {
        self.connections.remove(participant_id)
    }

    /// Remove a participant only if it is still held by `connection_id`
    pub fn remove_connection(&mut self, participant_id: &str, connection_id: Uuid) -> bool {
        match self.connections.get(participant_id) {
            Some(handle) if handle.connection_id == connection_id => {
                self.connections.remove(participant_id);
                true
            }
            _ => false,
        }
    }

    /// Resolve where a message from `from` goes under `policy`
    pub fn destinations(
        &self,
        from: &str,
        policy: RelayPolicy,
    ) -> Vec<(ParticipantId, mpsc::Sender<String>)> {
        self.connections
            .iter()
            .filter(|(id, _)| policy.delivers(from, id))
            .map(|(id, handle)| (id.clone(), handle.outbound.clone()))
            .collect()
    }

    /// Disconnect and drop every participant, returning how many there were
    pub fn close_all(&mut self) -> usize {
        let count = self.connections.len();
        for handle in self.connections.values() {
            handle.disconnect();
        }
        self.connections.clear();
        count
    }

    /// Snapshot for listing
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            owner: self.owner.clone(),
            participants: self.participant_ids(),
            created_at: self.created_at,
        }
    }
}
