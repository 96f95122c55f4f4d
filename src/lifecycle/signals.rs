//! OS signal handling.

use crate::lifecycle::Shutdown;

/// Wait for Ctrl-C and trigger shutdown.
pub async fn shutdown_on_ctrl_c(shutdown: Shutdown) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
    shutdown.trigger();
}
