//! HTTP server lifecycle.

use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tracing::info;

use dse_core::{DseError, Result};

use crate::routes;
use crate::state::AppState;

/// Binds and serves the API until Ctrl-C.
///
/// # Errors
/// Returns an error when the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = routes::router(state).layer(CompressionLayer::new());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DseError::Other(format!("Failed to bind {addr}: {e}")))?;
    info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DseError::Other(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        return;
    }
    info!("Shutdown signal received");
}
