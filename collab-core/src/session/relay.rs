//! Relay policy: who receives a message sent by one participant

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::ParticipantId;

/// Destination set for relayed messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolicy {
    /// Send the message back to its sender only
    #[default]
    EchoSelf,
    /// Send to every participant except the sender
    BroadcastOthers,
    /// Send to every participant, sender included
    BroadcastAll,
}

impl RelayPolicy {
    /// Whether a message from `from` is delivered to `to`
    pub fn delivers(&self, from: &str, to: &str) -> bool {
        match self {
            RelayPolicy::EchoSelf => from == to,
            RelayPolicy::BroadcastOthers => from != to,
            RelayPolicy::BroadcastAll => true,
        }
    }

    /// Configuration name of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayPolicy::EchoSelf => "echo_self",
            RelayPolicy::BroadcastOthers => "broadcast_others",
            RelayPolicy::BroadcastAll => "broadcast_all",
        }
    }
}

impl fmt::Display for RelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown relay policy '{0}' (expected echo_self, broadcast_others or broadcast_all)")]
pub struct ParseRelayPolicyError(String);

impl FromStr for RelayPolicy {
    type Err = ParseRelayPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "echo_self" => Ok(RelayPolicy::EchoSelf),
            "broadcast_others" => Ok(RelayPolicy::BroadcastOthers),
            "broadcast_all" => Ok(RelayPolicy::BroadcastAll),
            _ => Err(ParseRelayPolicyError(s.to_string())),
        }
    }
}

/// What happened to one relayed message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Destinations the message was queued for
    pub delivered: usize,
    /// Destinations whose queue was full; the message was dropped for them
    pub dropped: Vec<ParticipantId>,
    /// Destinations whose relay loop has already gone away
    pub disconnected: Vec<ParticipantId>,
}
