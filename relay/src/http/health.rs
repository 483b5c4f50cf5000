//! Health check endpoint.

use crate::server::TelemetryRelay;
use crate::store::FragmentStore;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Fragments holding any record.
    pub fragments: usize,
    /// Whether a producer has completed a start handshake.
    pub handshake_received: bool,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
) -> Json<HealthStatus> {
    let stats = relay.store().stats().await;

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        fragments: stats.fragments,
        handshake_received: stats.handshake_received,
        uptime_seconds: relay.uptime_secs(),
    })
}
