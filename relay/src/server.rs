//! Main TelemetryRelay coordination.
//!
//! TelemetryRelay owns the fragment store, rate limiters and metrics, and is
//! shared by every request handler.

use crate::cleanup::spawn_cleanup_task;
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::http::build_router;
use crate::limits::RateLimits;
use crate::store::MemoryStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Start submissions stored.
    pub starts_total: AtomicU64,
    /// Full snapshots stored.
    pub fulls_total: AtomicU64,
    /// Deltas stored.
    pub deltas_total: AtomicU64,
    /// Full/delta submissions answered with 205 (handshake missing).
    pub handshake_resets_total: AtomicU64,
    /// Consumer payload fetches served.
    pub fetches_total: AtomicU64,
    /// Consumer fetches that found nothing stored.
    pub fetch_misses_total: AtomicU64,
    /// Sync reports served.
    pub sync_requests_total: AtomicU64,
    /// Payload bytes received from producers.
    pub bytes_received: AtomicU64,
    /// Payload bytes sent to consumers.
    pub bytes_sent: AtomicU64,
    /// Requests rejected by a rate limiter.
    pub rate_limit_hits: AtomicU64,
    /// Requests rejected for bad parameters or unreadable bodies.
    pub errors_total: AtomicU64,
}

/// Main relay server.
#[derive(Debug)]
pub struct TelemetryRelay {
    config: Config,
    store: MemoryStore,
    /// Rate limiters for ingress and global traffic.
    rate_limits: RateLimits,
    /// Operational metrics (counters).
    metrics: RelayMetrics,
    started_at: Instant,
}

impl TelemetryRelay {
    /// Create a new TelemetryRelay with the given config and store.
    pub fn new(config: Config, store: MemoryStore) -> Self {
        let rate_limits = RateLimits::new(&config.limits);
        Self {
            config,
            store,
            rate_limits,
            metrics: RelayMetrics::default(),
            started_at: Instant::now(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the fragment store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Seconds since the relay was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Bind the configured address and serve until `shutdown` resolves.
///
/// Also runs the cleanup task for the lifetime of the server.
///
/// # Errors
///
/// Returns an error if the bind address is invalid or the listener fails.
pub async fn serve<F>(relay: Arc<TelemetryRelay>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = relay.config().server.bind_address.clone();
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| RelayError::BindAddress { address, source })?;

    let listener = TcpListener::bind(addr).await?;
    serve_on(relay, listener, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve_on<F>(relay: Arc<TelemetryRelay>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cleanup = spawn_cleanup_task(relay.rate_limits().clone(), relay.config().cleanup.clone());

    tracing::info!("Telemetry relay listening on {}", listener.local_addr()?);
    let result = axum::serve(listener, build_router(relay))
        .with_graceful_shutdown(shutdown)
        .await;

    cleanup.abort();
    tracing::info!("Telemetry relay stopped");
    result.map_err(RelayError::Io)
}
