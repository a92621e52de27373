use cluster_probe::{CassandraHealthCheck, DiagnosticSession, open, retry_with_backoff};
use core_config::tracing::{init_tracing, install_color_eyre};
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod server;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.environment);

    info!(
        contact_points = ?config.cassandra.contact_points,
        attempts = config.startup_attempts,
        "Connecting to Cassandra"
    );

    let connection = Arc::new(
        retry_with_backoff(|| open(&config.cassandra), &config.startup_backoff()).await?,
    );

    let session: Arc<dyn DiagnosticSession> = connection.clone();
    let state = AppState {
        app: config.app,
        cassandra: CassandraHealthCheck::new(session, config.cassandra.liveness_timeout()),
    };

    info!("Starting {} v{}", config.app.name, config.app.version);
    let served = server::serve(api::router(state), &config.server).await;

    // The router and its state are gone once `serve` returns.
    match Arc::try_unwrap(connection) {
        Ok(connection) => connection.close().await,
        Err(_) => warn!("Diagnostic connection still shared at shutdown, dropping it"),
    }

    served.map_err(|e| eyre::eyre!("Server error: {}", e))?;
    info!("Cluster health API shutdown complete");
    Ok(())
}
