//! Prometheus metrics endpoint.

use crate::server::TelemetryRelay;
use crate::store::FragmentStore;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format, or 404 when metrics are
/// disabled in the config.
pub async fn metrics_handler(Extension(relay): Extension<Arc<TelemetryRelay>>) -> Response {
    if !relay.config().http.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    let m = relay.metrics();

    // Counters, monotonic since startup
    let starts = m.starts_total.load(Ordering::Relaxed);
    let fulls = m.fulls_total.load(Ordering::Relaxed);
    let deltas = m.deltas_total.load(Ordering::Relaxed);
    let resets = m.handshake_resets_total.load(Ordering::Relaxed);
    let fetches = m.fetches_total.load(Ordering::Relaxed);
    let misses = m.fetch_misses_total.load(Ordering::Relaxed);
    let syncs = m.sync_requests_total.load(Ordering::Relaxed);
    let bytes_rx = m.bytes_received.load(Ordering::Relaxed);
    let bytes_tx = m.bytes_sent.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    // Gauges
    let stats = relay.store().stats().await;
    let limiter_keys = relay.rate_limits().ingress_keys_count();
    let handshake = u8::from(stats.handshake_received);

    let body = format!(
        r#"# HELP telemetry_relay_info Server information
# TYPE telemetry_relay_info gauge
telemetry_relay_info{{version="{version}"}} 1

# HELP telemetry_relay_submissions_total Producer payloads stored, by kind
# TYPE telemetry_relay_submissions_total counter
telemetry_relay_submissions_total{{kind="start"}} {starts}
telemetry_relay_submissions_total{{kind="full"}} {fulls}
telemetry_relay_submissions_total{{kind="delta"}} {deltas}

# HELP telemetry_relay_handshake_resets_total Submissions answered with 205 before any start
# TYPE telemetry_relay_handshake_resets_total counter
telemetry_relay_handshake_resets_total {resets}

# HELP telemetry_relay_fetches_total Consumer payload fetches served
# TYPE telemetry_relay_fetches_total counter
telemetry_relay_fetches_total {fetches}

# HELP telemetry_relay_fetch_misses_total Consumer fetches answered with an empty body
# TYPE telemetry_relay_fetch_misses_total counter
telemetry_relay_fetch_misses_total {misses}

# HELP telemetry_relay_sync_requests_total Sync reports served
# TYPE telemetry_relay_sync_requests_total counter
telemetry_relay_sync_requests_total {syncs}

# HELP telemetry_relay_bytes_received_total Payload bytes received from producers
# TYPE telemetry_relay_bytes_received_total counter
telemetry_relay_bytes_received_total {bytes_rx}

# HELP telemetry_relay_bytes_sent_total Payload bytes sent to consumers
# TYPE telemetry_relay_bytes_sent_total counter
telemetry_relay_bytes_sent_total {bytes_tx}

# HELP telemetry_relay_rate_limit_hits_total Requests rejected by a rate limiter
# TYPE telemetry_relay_rate_limit_hits_total counter
telemetry_relay_rate_limit_hits_total {rate_limits}

# HELP telemetry_relay_errors_total Requests rejected for bad parameters or bodies
# TYPE telemetry_relay_errors_total counter
telemetry_relay_errors_total {errors}

# HELP telemetry_relay_fragments Fragments holding a record, by kind
# TYPE telemetry_relay_fragments gauge
telemetry_relay_fragments{{kind="start"}} {start_fragments}
telemetry_relay_fragments{{kind="full"}} {full_fragments}
telemetry_relay_fragments{{kind="delta"}} {delta_fragments}

# HELP telemetry_relay_stored_bytes Payload bytes currently held in memory
# TYPE telemetry_relay_stored_bytes gauge
telemetry_relay_stored_bytes {stored_bytes}

# HELP telemetry_relay_handshake_received Whether a start handshake has been received
# TYPE telemetry_relay_handshake_received gauge
telemetry_relay_handshake_received {handshake}

# HELP telemetry_relay_limiter_fragments Fragments tracked by the ingress rate limiter
# TYPE telemetry_relay_limiter_fragments gauge
telemetry_relay_limiter_fragments {limiter_keys}
"#,
        version = env!("CARGO_PKG_VERSION"),
        start_fragments = stats.start_fragments,
        full_fragments = stats.full_fragments,
        delta_fragments = stats.delta_fragments,
        stored_bytes = stats.stored_bytes,
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
