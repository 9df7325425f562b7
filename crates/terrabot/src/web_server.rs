//! Liveness endpoint for the hosting platform.
//!
//! Runs on PORT (default 8080) next to the long-polling dispatcher.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

/// Routes served by the health server.
pub fn router() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Starts the health server and serves until the process exits.
pub async fn start_web_server(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Starting health server on http://{}", addr);
    log::info!("  /        - Status line");
    log::info!("  /health  - Health check");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

async fn root_handler() -> &'static str {
    "OK - territory bot is running"
}

async fn health_handler() -> &'static str {
    "healthy"
}
