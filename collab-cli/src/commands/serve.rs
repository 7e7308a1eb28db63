//! Collab serve command
//!
//! Runs the collab server in the foreground until Ctrl-C. Sessions live only
//! as long as the process.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use collab_core::RelayPolicy;
use collab_server::{CollabServer, ServerConfig};
use tracing::{info, warn};

use crate::config::{CollabConfig, ConfigLoader};

/// Arguments for the serve command
///
/// Every flag is optional; unset flags fall back to the config files.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Seconds a session may stay empty after creation
    #[arg(long)]
    pub grace_window_secs: Option<u64>,

    /// Relay policy: echo-self, broadcast-others or broadcast-all
    #[arg(long)]
    pub relay_policy: Option<RelayPolicy>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = resolve_config(ConfigLoader::load()?, &args);

    info!(
        "Starting collab server on {} (grace window {:?}, relay policy {})",
        config.addr(),
        config.registry.grace_window,
        config.registry.relay_policy
    );

    CollabServer::new(config).run_until(shutdown_signal()).await?;

    info!("Collab server stopped");
    Ok(())
}

/// Apply command line overrides on top of the loaded config
fn resolve_config(file: CollabConfig, args: &ServeArgs) -> ServerConfig {
    let mut config = file.server_config();
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(secs) = args.grace_window_secs {
        config.registry.grace_window = Duration::from_secs(secs);
    }
    if let Some(policy) = args.relay_policy {
        config.registry.relay_policy = policy;
    }
    config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        // Without a signal handler the server runs until killed
        std::future::pending::<()>().await;
    }
}
