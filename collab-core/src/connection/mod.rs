//! Participant connection abstraction

pub mod channel;
pub mod traits;

// Re-export key types for convenience
pub use channel::{ChannelConnection, ChannelPeer};
pub use traits::Connection;
