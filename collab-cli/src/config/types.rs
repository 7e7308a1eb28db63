use std::time::Duration;

use collab_core::{DEFAULT_GRACE_WINDOW, DEFAULT_OUTBOUND_BUFFER, RegistryConfig, RelayPolicy};
use serde::{Deserialize, Serialize};

/// Default host for the collab server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port for the collab server
pub const DEFAULT_PORT: u16 = 7433;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCollabConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub session: RawSessionConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Session config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSessionConfig {
    pub grace_window_secs: Option<u64>,
    pub relay_policy: Option<RelayPolicy>,
    pub outbound_buffer: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CollabConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Host address to bind to
    pub host: String,

    /// Port for the collab server
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    /// Seconds an empty session survives before it is discarded
    pub grace_window_secs: u64,

    /// Who receives a participant's messages
    pub relay_policy: RelayPolicy,

    /// Per-participant outbound queue capacity
    pub outbound_buffer: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            grace_window_secs: DEFAULT_GRACE_WINDOW.as_secs(),
            relay_policy: RelayPolicy::default(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl CollabConfig {
    /// Build the server configuration this file describes
    pub fn server_config(&self) -> collab_server::ServerConfig {
        collab_server::ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            registry: RegistryConfig {
                grace_window: Duration::from_secs(self.session.grace_window_secs),
                relay_policy: self.session.relay_policy,
                // A zero-capacity channel cannot be created
                outbound_buffer: self.session.outbound_buffer.max(1),
            },
        }
    }
}
