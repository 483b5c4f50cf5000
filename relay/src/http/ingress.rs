//! Producer-facing submission endpoints.
//!
//! `POST /{token}/{fragment}/{start|full|delta}`. Parameters and the body
//! are fully validated before the store is touched, so a rejected request
//! leaves it unchanged.

use crate::error::RequestError;
use crate::server::TelemetryRelay;
use crate::store::{FragmentStore, HandshakeStatus};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::Extension;
use relay_types::{parse_tick, FragmentId, Handshake, PayloadKind};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

type Params = HashMap<String, String>;

/// Accept a start handshake.
///
/// Requires `tps` and `protocol` query parameters. Always answers 200 once
/// stored.
pub async fn submit_start(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path((token, fragment)): Path<(String, FragmentId)>,
    Query(params): Query<Params>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, RequestError> {
    let kind = PayloadKind::Start;
    let (handshake, payload) = admit(&relay, fragment)
        .and_then(|()| {
            let handshake = Handshake::parse(param(&params, "tps"), param(&params, "protocol"))?;
            Ok((handshake, read_body(&relay, body)?))
        })
        .map_err(|e| reject(&relay, kind, &token, fragment, e))?;

    tracing::info!(
        "Start for fragment {} (token {}): tps={} protocol={} ({} bytes)",
        fragment,
        token,
        handshake.tps,
        handshake.protocol,
        payload.len()
    );
    relay.store().put_start(fragment, payload, handshake).await;
    relay.metrics().starts_total.fetch_add(1, Ordering::Relaxed);

    Ok(StatusCode::OK)
}

/// Accept a full snapshot.
///
/// Requires a `tick` query parameter. Answers 205 while no start handshake
/// has been received, 200 otherwise.
pub async fn submit_full(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path((token, fragment)): Path<(String, FragmentId)>,
    Query(params): Query<Params>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, RequestError> {
    let kind = PayloadKind::Full;
    let (tick, payload) = admit(&relay, fragment)
        .and_then(|()| {
            let tick = parse_tick(param(&params, "tick"))?;
            Ok((tick, read_body(&relay, body)?))
        })
        .map_err(|e| reject(&relay, kind, &token, fragment, e))?;

    tracing::debug!(
        "Full for fragment {} (token {}): tick={} ({} bytes)",
        fragment,
        token,
        tick,
        payload.len()
    );
    let status = relay.store().put_full(fragment, payload, tick).await;
    relay.metrics().fulls_total.fetch_add(1, Ordering::Relaxed);

    Ok(respond(&relay, kind, fragment, status))
}

/// Accept a delta.
///
/// Answers 205 while no start handshake has been received, 200 otherwise.
pub async fn submit_delta(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    Path((token, fragment)): Path<(String, FragmentId)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, RequestError> {
    let kind = PayloadKind::Delta;
    let payload = admit(&relay, fragment)
        .and_then(|()| read_body(&relay, body))
        .map_err(|e| reject(&relay, kind, &token, fragment, e))?;

    tracing::debug!(
        "Delta for fragment {} (token {}) ({} bytes)",
        fragment,
        token,
        payload.len()
    );
    let status = relay.store().put_delta(fragment, payload).await;
    relay.metrics().deltas_total.fetch_add(1, Ordering::Relaxed);

    Ok(respond(&relay, kind, fragment, status))
}

fn param<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str)
}

/// Per-fragment ingress rate limit.
fn admit(relay: &TelemetryRelay, fragment: FragmentId) -> Result<(), RequestError> {
    relay
        .rate_limits()
        .check_ingress(fragment)
        .map_err(|e| RequestError::RateLimited {
            reason: e.to_string(),
        })
}

fn read_body(
    relay: &TelemetryRelay,
    body: Result<Bytes, BytesRejection>,
) -> Result<Bytes, RequestError> {
    let payload = body.map_err(|e| RequestError::Body {
        status: e.status(),
        reason: e.body_text(),
    })?;
    relay
        .metrics()
        .bytes_received
        .fetch_add(payload.len() as u64, Ordering::Relaxed);
    Ok(payload)
}

fn reject(
    relay: &TelemetryRelay,
    kind: PayloadKind,
    token: &str,
    fragment: FragmentId,
    err: RequestError,
) -> RequestError {
    let counter = match err {
        RequestError::RateLimited { .. } => &relay.metrics().rate_limit_hits,
        _ => &relay.metrics().errors_total,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    tracing::warn!(
        "Rejected {} for fragment {} (token {}): {}",
        kind,
        fragment,
        token,
        err
    );
    err
}

/// 205 asks the producer to resend its start before continuing.
fn respond(
    relay: &TelemetryRelay,
    kind: PayloadKind,
    fragment: FragmentId,
    status: HandshakeStatus,
) -> StatusCode {
    match status {
        HandshakeStatus::Received => StatusCode::OK,
        HandshakeStatus::Missing => {
            relay
                .metrics()
                .handshake_resets_total
                .fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                "Stored {} for fragment {} before any start; requesting handshake",
                kind,
                fragment
            );
            StatusCode::RESET_CONTENT
        }
    }
}
