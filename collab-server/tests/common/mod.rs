//! Shared test utilities for collab-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use collab_core::RegistryConfig;
use collab_server::{AppState, CollabServer, ServerConfig};
use tokio::net::TcpListener;

/// Creates a test server with default config, returns state and address
#[allow(dead_code)]
pub async fn create_test_server() -> (Arc<AppState>, SocketAddr) {
    create_test_server_with_registry(RegistryConfig::default()).await
}

/// Creates a test server with custom registry settings
#[allow(dead_code)]
pub async fn create_test_server_with_registry(
    registry: RegistryConfig,
) -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(AppState::with_registry_config(registry.clone()));
    let config = ServerConfig {
        registry,
        ..ServerConfig::default()
    };

    let server = CollabServer::with_state(config, Arc::clone(&state));
    let addr = spawn_server(server).await;

    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: CollabServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server
            .run_with_listener(listener, std::future::pending())
            .await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}

/// Polls until the session has exactly `expected` participants
#[allow(dead_code)]
pub async fn wait_for_participants(state: &AppState, session_id: &str, expected: &[&str]) {
    for _ in 0..200 {
        if let Ok(participants) = state.registry.participants(session_id).await
            && participants == expected
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "session {} never reached participants {:?}",
        session_id, expected
    );
}
