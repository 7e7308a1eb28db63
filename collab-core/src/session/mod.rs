//! Collaborative session management

pub mod admission;
pub mod expiry;
pub mod registry;
pub mod relay;
pub mod state;

// Re-export key types for convenience
pub use admission::{Admission, DisconnectReason};
pub use expiry::{DEFAULT_GRACE_WINDOW, ExpirySupervisor};
pub use registry::{Attachment, DEFAULT_OUTBOUND_BUFFER, RegistryConfig, SessionRegistry};
pub use relay::{ParseRelayPolicyError, RelayOutcome, RelayPolicy};
pub use state::{
    ParticipantHandle, ParticipantId, ParticipantInbox, Session, SessionId, SessionSummary,
    participant_channel,
};
