//! Metrics and health endpoint served while a run is active.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::metrics::encode_metrics;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

pub async fn metrics() -> String {
    encode_metrics()
}

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn spawn(addr: SocketAddr, shutdown: CancellationToken) -> Result<JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics endpoint to {}", addr))?;
    info!("Serving metrics on {}", addr);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, create_router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            error!("Metrics server error: {}", e);
        }
    }))
}
