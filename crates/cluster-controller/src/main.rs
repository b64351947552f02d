//! # Cluster Controller
//!
//! Entry point of the cluster controller node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file named by `CC_CONFIG`, then environment)
//! 2. Initialize logging
//! 3. Start routing, access control and dispatching
//! 4. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use cluster_controller::{init_logging, ClusterController, ClusterControllerConfig};
use shared_types::SystemTimeSource;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClusterControllerConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let controller = ClusterController::start(config, Arc::new(SystemTimeSource))
        .context("Failed to start cluster controller")?;

    info!("Cluster controller is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    controller.shutdown().await;
    Ok(())
}
