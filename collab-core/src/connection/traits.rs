//! Connection trait
//!
//! A `Connection` is one participant's bidirectional message stream. The
//! transport handshake happens elsewhere; by the time a value implementing
//! this trait exists, the stream is open and ready to carry text messages.

use async_trait::async_trait;

use crate::error::ConnectionError;

/// Bidirectional text message stream for a single participant
///
/// Implementations handle the actual transport, whether a WebSocket,
/// an in-memory channel, or anything else that can carry text frames.
#[async_trait]
pub trait Connection: Send {
    /// Wait for the next message from the peer
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly.
    /// Must be cancel-safe: the relay loop races it against outbound delivery.
    async fn recv(&mut self) -> Result<Option<String>, ConnectionError>;

    /// Deliver a message to the peer
    async fn send(&mut self, message: String) -> Result<(), ConnectionError>;

    /// Release the underlying stream
    ///
    /// Called exactly once when the relay loop exits. Never fails; transports
    /// log their own close errors.
    async fn close(&mut self);
}
