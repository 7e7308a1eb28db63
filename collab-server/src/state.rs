//! Shared application state for the collab server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use collab_core::{Admission, RegistryConfig, SessionRegistry};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Registry of live collaborative sessions
    pub registry: Arc<SessionRegistry>,
    /// Join handshake and relay driver
    pub admission: Admission,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState with default registry settings
    pub fn new() -> Self {
        Self::with_registry_config(RegistryConfig::default())
    }

    /// Create AppState with custom registry settings
    pub fn with_registry_config(config: RegistryConfig) -> Self {
        Self::with_registry(SessionRegistry::new(config))
    }

    /// Create AppState around an existing registry (for testing)
    pub fn with_registry(registry: Arc<SessionRegistry>) -> Self {
        Self {
            admission: Admission::new(Arc::clone(&registry)),
            registry,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
