//! collab-core: Core library for ephemeral collaborative sessions
//!
//! This crate provides the transport-agnostic parts of collab:
//!
//! - **Connections** - the [`Connection`] trait over one participant's message stream
//! - **Session registry** - [`SessionRegistry`] for creating, joining and expiring sessions
//! - **Expiry** - [`ExpirySupervisor`] one-shot grace-window timers
//! - **Admission** - [`Admission`] join handshake and per-connection relay loop
//!
//! # Quick Start
//!
//! ```no_run
//! use collab_core::{Admission, ChannelConnection, RegistryConfig, SessionRegistry};
//!
//! async fn example() {
//!     let registry = SessionRegistry::new(RegistryConfig::default());
//!     let session_id = registry.create_session("owner").await;
//!
//!     let (connection, mut peer) = ChannelConnection::pair(16);
//!     let admission = Admission::new(registry.clone());
//!     tokio::spawn(async move { admission.run(&session_id, "alice", connection).await });
//!
//!     peer.send("hello").await;
//!     assert_eq!(peer.recv().await.as_deref(), Some("hello"));
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SessionRegistry                │
//! │  RwLock<HashMap<SessionId, Session>>         │
//! │  ┌────────────────┐  ┌────────────────────┐  │
//! │  │    Session     │  │  ExpirySupervisor  │  │
//! │  │ participant -> │  │  one timer per id  │  │
//! │  │    handle      │  └────────────────────┘  │
//! │  └────────────────┘                          │
//! └──────────────────────────────────────────────┘
//!        ▲ join / relay / detach
//! ┌──────┴───────┐
//! │  Admission   │  one task per Connection
//! └──────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod session;

// Re-export key types for convenience
pub use connection::{ChannelConnection, ChannelPeer, Connection};
pub use error::{ConnectionError, SessionError};
pub use session::{
    Admission, Attachment, DEFAULT_GRACE_WINDOW, DEFAULT_OUTBOUND_BUFFER, DisconnectReason,
    ExpirySupervisor, ParseRelayPolicyError, ParticipantHandle, ParticipantId, ParticipantInbox,
    RegistryConfig, RelayOutcome, RelayPolicy, Session, SessionId, SessionRegistry,
    SessionSummary, participant_channel,
};
