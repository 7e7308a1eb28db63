//! In-memory connection for testing and embedding
//!
//! `ChannelConnection::pair` returns the participant side (handed to the
//! admission protocol) and the peer side (held by whoever plays the remote
//! client). Everything the peer sends shows up in `recv`, everything the
//! relay loop sends shows up in `ChannelPeer::recv`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::Connection;
use crate::error::ConnectionError;

type Inbound = Result<String, ConnectionError>;

/// Connection backed by a pair of tokio channels
pub struct ChannelConnection {
    incoming: mpsc::Receiver<Inbound>,
    outgoing: Option<mpsc::Sender<String>>,
    closed: Arc<AtomicBool>,
}

/// Remote end of a [`ChannelConnection`]
pub struct ChannelPeer {
    tx: Option<mpsc::Sender<Inbound>>,
    rx: mpsc::Receiver<String>,
    closed: Arc<AtomicBool>,
}

impl ChannelConnection {
    /// Create a connected pair with the given per-direction capacity
    pub fn pair(capacity: usize) -> (ChannelConnection, ChannelPeer) {
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let closed = Arc::new(AtomicBool::new(false));

        let connection = ChannelConnection {
            incoming: in_rx,
            outgoing: Some(out_tx),
            closed: Arc::clone(&closed),
        };
        let peer = ChannelPeer {
            tx: Some(in_tx),
            rx: out_rx,
            closed,
        };
        (connection, peer)
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn recv(&mut self) -> Result<Option<String>, ConnectionError> {
        match self.incoming.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn send(&mut self, message: String) -> Result<(), ConnectionError> {
        let outgoing = self
            .outgoing
            .as_ref()
            .ok_or_else(|| ConnectionError::Write("connection closed".to_string()))?;
        outgoing
            .send(message)
            .await
            .map_err(|_| ConnectionError::Write("peer stopped reading".to_string()))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.incoming.close();
        self.outgoing = None;
    }
}

impl ChannelPeer {
    /// Send a message to the participant side
    ///
    /// Returns false if the participant side is gone.
    pub async fn send(&self, message: impl Into<String>) -> bool {
        match &self.tx {
            Some(tx) => tx.send(Ok(message.into())).await.is_ok(),
            None => false,
        }
    }

    /// Make the participant side's next `recv` fail
    pub async fn fail_read(&self, reason: impl Into<String>) -> bool {
        match &self.tx {
            Some(tx) => tx
                .send(Err(ConnectionError::Read(reason.into())))
                .await
                .is_ok(),
            None => false,
        }
    }

    /// Receive the next message the participant side sent
    ///
    /// Returns `None` once the participant side has closed and all
    /// buffered messages were drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Hang up: the participant side sees a clean end of stream
    pub fn hang_up(&mut self) {
        self.tx = None;
    }

    /// Stop accepting messages: the participant side's sends start failing
    pub fn stop_reading(&mut self) {
        self.rx.close();
    }

    /// Whether the participant side released the stream
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn peer_messages_arrive_at_connection() {
        let (mut conn, peer) = ChannelConnection::pair(4);

        assert!(peer.send("hello").await);

        assert_eq!(conn.recv().await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn connection_messages_arrive_at_peer() {
        let (mut conn, mut peer) = ChannelConnection::pair(4);

        conn.send("pong".to_string()).await.unwrap();

        assert_eq!(peer.recv().await, Some("pong".to_string()));
    }

    #[tokio::test]
    async fn hang_up_reads_as_clean_close() {
        let (mut conn, mut peer) = ChannelConnection::pair(4);

        peer.hang_up();

        assert_eq!(conn.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn fail_read_surfaces_read_error() {
        let (mut conn, peer) = ChannelConnection::pair(4);

        peer.fail_read("reset").await;

        let err = conn.recv().await.unwrap_err();
        assert_eq!(err, ConnectionError::Read("reset".to_string()));
    }

    #[tokio::test]
    async fn send_fails_after_peer_stops_reading() {
        let (mut conn, mut peer) = ChannelConnection::pair(4);

        peer.stop_reading();

        let err = conn.send("lost".to_string()).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Write(_)));
    }

    #[tokio::test]
    async fn close_marks_peer_closed_and_ends_stream() {
        let (mut conn, mut peer) = ChannelConnection::pair(4);
        assert!(!peer.is_closed());

        conn.close().await;

        assert!(peer.is_closed());
        assert_eq!(peer.recv().await, None);
        assert!(!peer.send("late").await);
    }
}
