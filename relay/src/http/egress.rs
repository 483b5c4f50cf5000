//! Consumer-facing read endpoints.
//!
//! `/match/{token}/{fragment}/{start|full|delta}` return the stored bytes
//! verbatim, or an empty 200 when nothing has been stored yet, so pollers
//! can tell "not yet" apart from a transport failure.
//! `/match/{token}/sync` returns the JSON [`SyncReport`].

use crate::server::TelemetryRelay;
use crate::store::FragmentStore;
use crate::sync_report::compute_sync_report;
use axum::body::Bytes;
use axum::extract::Path;
use axum::{Extension, Json};
use relay_types::{FragmentId, PayloadKind, SyncReport};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Serve the start payload for a fragment.
pub async fn fetch_start(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path((token, fragment)): Path<(String, FragmentId)>,
) -> Bytes {
    let payload = relay.store().get_start(fragment).await.map(|r| r.payload);
    serve_payload(&relay, PayloadKind::Start, &token, fragment, payload)
}

/// Serve the latest full snapshot for a fragment.
pub async fn fetch_full(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path((token, fragment)): Path<(String, FragmentId)>,
) -> Bytes {
    let payload = relay.store().get_full(fragment).await.map(|r| r.payload);
    serve_payload(&relay, PayloadKind::Full, &token, fragment, payload)
}

/// Serve the latest delta for a fragment.
pub async fn fetch_delta(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path((token, fragment)): Path<(String, FragmentId)>,
) -> Bytes {
    let payload = relay.store().get_delta(fragment).await.map(|r| r.payload);
    serve_payload(&relay, PayloadKind::Delta, &token, fragment, payload)
}

/// Serve the freshness report for the active fragment.
pub async fn fetch_sync(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path(token): Path<String>,
) -> Json<SyncReport> {
    let report = compute_sync_report(relay.store()).await;
    relay.metrics().sync_requests_total.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("Sync for token {}: {:?}", token, report);
    Json(report)
}

fn serve_payload(
    relay: &TelemetryRelay,
    kind: PayloadKind,
    token: &str,
    fragment: FragmentId,
    payload: Option<Bytes>,
) -> Bytes {
    let metrics = relay.metrics();
    metrics.fetches_total.fetch_add(1, Ordering::Relaxed);

    match payload {
        Some(bytes) => {
            metrics
                .bytes_sent
                .fetch_add(bytes.len() as u64, Ordering::Relaxed);
            bytes
        }
        None => {
            metrics.fetch_misses_total.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Missing {} data for fragment {} (token {})",
                kind,
                fragment,
                token
            );
            Bytes::new()
        }
    }
}
