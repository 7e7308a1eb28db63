//! WebSocket module for joining sessions

mod connection;

pub use connection::{JoinRequest, WebSocketConnection, join_session};
