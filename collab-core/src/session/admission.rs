//! Admission protocol: attach a connection to a session and relay for it
//!
//! ```text
//! Pending -> Validating -> Attached -> Relaying -> Detaching -> Closed
//!                 |
//!                 +-> Rejected (stream closed, NotFound returned)
//! ```
//!
//! Any transport failure ends the connection, in either direction. The
//! stream is closed on every exit path.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{ConnectionError, SessionError};

use super::registry::{Attachment, SessionRegistry};
use super::state::{ParticipantInbox, participant_channel};

/// Why a participant's relay loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the stream
    PeerClosed,
    /// Reading from the stream failed
    ReadFailed(ConnectionError),
    /// Writing to the stream failed
    WriteFailed(ConnectionError),
    /// The session forced the participant out (replaced, closed or shut down)
    Evicted,
}

/// Runs the join handshake and relay loop for participant connections
#[derive(Clone)]
pub struct Admission {
    registry: Arc<SessionRegistry>,
}

impl Admission {
    /// Create an admission driver over a registry
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Attach `connection` to a session and relay until it disconnects
    ///
    /// Returns `SessionError::NotFound` (after closing the stream) if the
    /// session does not exist. Otherwise returns once the participant has
    /// been detached and the stream closed.
    pub async fn run<C: Connection>(
        &self,
        session_id: &str,
        participant_id: &str,
        mut connection: C,
    ) -> Result<DisconnectReason, SessionError> {
        let (handle, mut inbox) = participant_channel(self.registry.config().outbound_buffer);

        let attachment = match self.registry.join(session_id, participant_id, handle).await {
            Ok(attachment) => attachment,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    participant_id = %participant_id,
                    "Rejected connection: {}", e
                );
                connection.close().await;
                return Err(e);
            }
        };

        let reason = self
            .relay_loop(&attachment, &mut connection, &mut inbox)
            .await;

        self.registry.detach(&attachment).await;
        connection.close().await;

        info!(
            session_id = %session_id,
            participant_id = %participant_id,
            reason = ?reason,
            "Connection closed"
        );
        Ok(reason)
    }

    async fn relay_loop<C: Connection>(
        &self,
        attachment: &Attachment,
        connection: &mut C,
        inbox: &mut ParticipantInbox,
    ) -> DisconnectReason {
        loop {
            tokio::select! {
                biased;

                _ = inbox.cancel.cancelled() => {
                    debug!(participant_id = %attachment.participant_id, "Participant evicted");
                    return DisconnectReason::Evicted;
                }

                outbound = inbox.messages.recv() => {
                    let Some(message) = outbound else {
                        // The session dropped our handle.
                        return DisconnectReason::Evicted;
                    };
                    // A peer that stops reading must not outlive its eviction.
                    let written = tokio::select! {
                        biased;
                        _ = inbox.cancel.cancelled() => {
                            debug!(
                                participant_id = %attachment.participant_id,
                                "Participant evicted during write"
                            );
                            return DisconnectReason::Evicted;
                        }
                        written = connection.send(message) => written,
                    };
                    if let Err(e) = written {
                        warn!(
                            session_id = %attachment.session_id,
                            participant_id = %attachment.participant_id,
                            "Write failed, disconnecting: {}", e
                        );
                        return DisconnectReason::WriteFailed(e);
                    }
                }

                received = connection.recv() => {
                    match received {
                        Ok(Some(message)) => {
                            if let Err(e) = self
                                .registry
                                .relay(&attachment.session_id, &attachment.participant_id, &message)
                                .await
                            {
                                debug!("Relay skipped: {}", e);
                            }
                        }
                        Ok(None) => {
                            debug!(participant_id = %attachment.participant_id, "Peer closed stream");
                            return DisconnectReason::PeerClosed;
                        }
                        Err(e) => {
                            warn!(
                                session_id = %attachment.session_id,
                                participant_id = %attachment.participant_id,
                                "Read failed, disconnecting: {}", e
                            );
                            return DisconnectReason::ReadFailed(e);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::connection::ChannelConnection;
    use crate::session::registry::RegistryConfig;
    use crate::session::relay::RelayPolicy;

    fn registry(relay_policy: RelayPolicy) -> Arc<SessionRegistry> {
        SessionRegistry::new(RegistryConfig {
            relay_policy,
            ..RegistryConfig::default()
        })
    }

    async fn wait_for_participants(registry: &SessionRegistry, id: &str, expected: usize) {
        for _ in 0..100 {
            if registry.participants(id).await.map(|p| p.len()).unwrap_or(0) == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {id} never reached {expected} participants");
    }

    #[tokio::test]
    async fn unknown_session_is_rejected_and_stream_closed() {
        let registry = registry(RelayPolicy::EchoSelf);
        let admission = Admission::new(Arc::clone(&registry));
        let (conn, peer) = ChannelConnection::pair(4);

        let result = admission.run("unknown-id", "alice", conn).await;

        assert_eq!(result, Err(SessionError::NotFound("unknown-id".to_string())));
        assert!(peer.is_closed());
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn echo_then_close_detaches_participant() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (conn, mut peer) = ChannelConnection::pair(4);

        let task = {
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        assert!(peer.send("hello").await);
        assert_eq!(peer.recv().await, Some("hello".to_string()));

        peer.hang_up();
        let reason = task.await.unwrap().unwrap();

        assert_eq!(reason, DisconnectReason::PeerClosed);
        assert!(peer.is_closed());
        assert!(registry.participants(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_failure_disconnects() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (conn, peer) = ChannelConnection::pair(4);

        let task = {
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        peer.fail_read("connection reset").await;
        let reason = task.await.unwrap().unwrap();

        assert_eq!(
            reason,
            DisconnectReason::ReadFailed(ConnectionError::Read("connection reset".to_string()))
        );
        assert!(peer.is_closed());
        assert!(registry.participants(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_failure_disconnects() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (conn, mut peer) = ChannelConnection::pair(4);

        let task = {
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        peer.stop_reading();
        peer.send("echo me").await;
        let reason = task.await.unwrap().unwrap();

        assert!(matches!(reason, DisconnectReason::WriteFailed(_)));
        assert!(registry.participants(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_others_reaches_other_participants() {
        let registry = registry(RelayPolicy::BroadcastOthers);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (alice_conn, alice) = ChannelConnection::pair(4);
        let (bob_conn, mut bob) = ChannelConnection::pair(4);

        for (name, conn) in [("alice", alice_conn), ("bob", bob_conn)] {
            let admission = admission.clone();
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, name, conn).await });
        }
        wait_for_participants(&registry, &id, 2).await;

        alice.send("hi bob").await;

        assert_eq!(bob.recv().await, Some("hi bob".to_string()));
    }

    #[tokio::test]
    async fn colliding_join_evicts_previous_connection() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (first_conn, first_peer) = ChannelConnection::pair(4);
        let (second_conn, mut second_peer) = ChannelConnection::pair(4);

        let first = {
            let admission = admission.clone();
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", first_conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        {
            let admission = admission.clone();
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", second_conn).await });
        }

        let reason = first.await.unwrap().unwrap();
        assert_eq!(reason, DisconnectReason::Evicted);
        assert!(first_peer.is_closed());

        // The replacement is still attached and still relaying.
        assert_eq!(registry.participants(&id).await.unwrap(), vec!["alice"]);
        second_peer.send("still here").await;
        assert_eq!(second_peer.recv().await, Some("still here".to_string()));
    }

    #[tokio::test]
    async fn colliding_join_evicts_connection_blocked_on_write() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        // The first peer never reads, so its echoes back up until send blocks.
        let (first_conn, first_peer) = ChannelConnection::pair(1);
        let (second_conn, mut second_peer) = ChannelConnection::pair(4);

        let first = {
            let admission = admission.clone();
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", first_conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        for message in ["one", "two", "three"] {
            assert!(first_peer.send(message).await);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        {
            let admission = admission.clone();
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", second_conn).await });
        }

        let reason = tokio::time::timeout(Duration::from_secs(2), first)
            .await
            .expect("evicted loop should finish")
            .unwrap()
            .unwrap();
        assert_eq!(reason, DisconnectReason::Evicted);
        assert!(first_peer.is_closed());

        assert_eq!(registry.participants(&id).await.unwrap(), vec!["alice"]);
        second_peer.send("replacement").await;
        assert_eq!(second_peer.recv().await, Some("replacement".to_string()));
    }

    #[tokio::test]
    async fn closing_session_evicts_participant_blocked_on_write() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (conn, peer) = ChannelConnection::pair(1);

        let task = {
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        for message in ["one", "two", "three"] {
            assert!(peer.send(message).await);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(registry.close_session(&id).await);
        let reason = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("evicted loop should finish")
            .unwrap()
            .unwrap();

        assert_eq!(reason, DisconnectReason::Evicted);
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn closing_session_evicts_participants() {
        let registry = registry(RelayPolicy::EchoSelf);
        let id = registry.create_session("owner").await;
        let admission = Admission::new(Arc::clone(&registry));
        let (conn, peer) = ChannelConnection::pair(4);

        let task = {
            let id = id.clone();
            tokio::spawn(async move { admission.run(&id, "alice", conn).await })
        };
        wait_for_participants(&registry, &id, 1).await;

        registry.close_session(&id).await;
        let reason = task.await.unwrap().unwrap();

        assert_eq!(reason, DisconnectReason::Evicted);
        assert!(peer.is_closed());
    }
}
