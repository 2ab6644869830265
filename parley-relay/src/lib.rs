mod relay_service;
mod ws_handler;

pub use relay_service::*;
pub use ws_handler::*;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws/{identity}", get(ws_handler))
        .route("/health", get(health))
        .route("/online", get(online))
        .with_state(service)
}

/// Serve the relay on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, service: RelayService) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Relay listening on ws://{}", addr);

    axum::serve(listener, router(service))
        .await
        .context("Relay server stopped")
}
