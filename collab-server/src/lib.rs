//! collab-server - HTTP and WebSocket server for collaborative sessions
//!
//! This crate wraps the collab-core SessionRegistry in an axum router:
//! sessions are created over REST and joined over WebSocket.

mod error;
pub mod http;
mod state;
pub mod ws;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use collab_core::RegistryConfig;
use tokio::net::TcpListener;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// The main collab server
pub struct CollabServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl CollabServer {
    /// Create a new server with state built from the config
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::with_registry_config(config.registry.clone()));
        Self { config, state }
    }

    /// Create a server with custom state (for testing)
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves, then close every session
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener, shutdown).await
    }

    /// Run the server on an already bound listener
    pub async fn run_with_listener<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("collab server listening on {}", addr);
        }

        let registry = Arc::clone(&self.state.registry);
        let router = create_router(self.state);
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown requested, closing sessions");
            // Evicts every participant so open WebSocket tasks can finish.
            registry.shutdown().await;
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Session registry settings
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7433,
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            registry: RegistryConfig::default(),
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:7433")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
