//! HTTP endpoints for telemetry-relay.
//!
//! Producer submissions, consumer reads, the sync report, health checks and
//! metrics, all served from one router.

mod egress;
pub mod health;
mod ingress;
mod metrics;

use crate::error::RequestError;
use crate::server::TelemetryRelay;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Extension, Router};
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<TelemetryRelay>) -> Router {
    let body_limit = relay.config().server.max_payload_size;

    Router::new()
        .route("/:token/:fragment/start", post(ingress::submit_start))
        .route("/:token/:fragment/full", post(ingress::submit_full))
        .route("/:token/:fragment/delta", post(ingress::submit_delta))
        .route("/match/:token/:fragment/start", any(egress::fetch_start))
        .route("/match/:token/:fragment/full", any(egress::fetch_full))
        .route("/match/:token/:fragment/delta", any(egress::fetch_delta))
        .route("/match/:token/sync", any(egress::fetch_sync))
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(global_rate_limit))
        .layer(Extension(relay))
}

/// Reject requests over the relay-wide rate with 429.
async fn global_rate_limit(
    Extension(relay): Extension<Arc<TelemetryRelay>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = relay.rate_limits().check_global() {
        relay.metrics().rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("Global rate limit exceeded: {} {}", request.method(), request.uri());
        return RequestError::RateLimited {
            reason: e.to_string(),
        }
        .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{FragmentStore, MemoryStore};
    use axum::body::{Body, Bytes};
    use axum::http::{Method, Request, StatusCode};
    use relay_types::{FragmentId, SyncReport};
    use tower::util::ServiceExt;

    fn test_relay() -> Arc<TelemetryRelay> {
        test_relay_with(Config::default())
    }

    fn test_relay_with(config: Config) -> Arc<TelemetryRelay> {
        Arc::new(TelemetryRelay::new(config, MemoryStore::new()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: &'static [u8]) -> (StatusCode, Bytes) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn submit(app: &Router, uri: &str, body: &'static [u8]) -> (StatusCode, Bytes) {
        send(app, Method::POST, uri, body).await
    }

    async fn fetch(app: &Router, uri: &str) -> (StatusCode, Bytes) {
        send(app, Method::GET, uri, b"").await
    }

    #[tokio::test]
    async fn start_full_fetch_and_sync_scenario() {
        let relay = test_relay();
        let app = build_router(relay.clone());

        let (status, _) = submit(&app, "/x/1/start?tps=60&protocol=3", b"hello").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = submit(&app, "/x/1/full?tick=100", b"snap").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = fetch(&app, "/match/x/1/full").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"snap");

        let (status, body) = fetch(&app, "/match/x/1/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"hello");

        let (status, body) = fetch(&app, "/match/x/sync").await;
        assert_eq!(status, StatusCode::OK);
        let report: SyncReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.tick, 100);
        assert_eq!(report.fragment, FragmentId::new(1));
        assert_eq!(report.signup_fragment, FragmentId::new(1));
        assert_eq!(report.tps, 60);
        assert_eq!(report.protocol, 3);
        assert!(report.rtdelay <= 1);
        assert!(report.rcvage <= 1);
    }

    #[tokio::test]
    async fn full_and_delta_before_start_request_handshake() {
        let relay = test_relay();
        let app = build_router(relay.clone());

        let (status, _) = submit(&app, "/x/2/full?tick=1", b"f").await;
        assert_eq!(status, StatusCode::RESET_CONTENT);
        let (status, _) = submit(&app, "/x/2/delta", b"d").await;
        assert_eq!(status, StatusCode::RESET_CONTENT);

        // Data is stored even when the handshake is missing.
        let (_, body) = fetch(&app, "/match/x/2/full").await;
        assert_eq!(&body[..], b"f");
        let (_, body) = fetch(&app, "/match/x/2/delta").await;
        assert_eq!(&body[..], b"d");

        // A start on any fragment settles every fragment.
        let (status, _) = submit(&app, "/x/9/start?tps=30&protocol=1", b"").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = submit(&app, "/x/2/full?tick=2", b"f2").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = submit(&app, "/x/3/delta", b"d3").await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(relay.metrics().handshake_resets_total.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn missing_data_is_empty_success() {
        let app = build_router(test_relay());

        for uri in ["/match/x/42/start", "/match/x/42/full", "/match/x/42/delta"] {
            let (status, body) = fetch(&app, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert!(body.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn egress_accepts_any_method() {
        let app = build_router(test_relay());
        submit(&app, "/x/1/delta", b"d").await;

        let (status, body) = send(&app, Method::POST, "/match/x/1/delta", b"").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"d");
    }

    #[tokio::test]
    async fn ingress_requires_post() {
        let app = build_router(test_relay());
        let (status, _) = fetch(&app, "/x/1/delta").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn empty_sync_report_before_any_full() {
        let app = build_router(test_relay());

        let (status, body) = fetch(&app, "/match/x/sync").await;
        assert_eq!(status, StatusCode::OK);
        let report: SyncReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn malformed_handshake_is_rejected_without_storing() {
        let relay = test_relay();
        let app = build_router(relay.clone());

        for uri in [
            "/x/1/start?protocol=3",
            "/x/1/start?tps=fast&protocol=3",
            "/x/1/start?tps=0&protocol=3",
            "/x/1/start?tps=60",
            "/x/1/start?tps=60&protocol=three",
        ] {
            let (status, _) = submit(&app, uri, b"start").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }

        assert!(relay.store().get_start(FragmentId::new(1)).await.is_none());
        assert!(!relay.store().stats().await.handshake_received);
        assert_eq!(relay.metrics().errors_total.load(Ordering::Relaxed), 5);

        // The relay keeps serving after bad requests.
        let (status, _) = submit(&app, "/x/1/start?tps=59.94&protocol=3", b"start").await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = fetch(&app, "/match/x/sync").await;
        let report: SyncReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.tps, 59);
    }

    #[tokio::test]
    async fn malformed_tick_is_rejected_without_storing() {
        let relay = test_relay();
        let app = build_router(relay.clone());

        let (status, body) = submit(&app, "/x/1/full?tick=soon", b"snap").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("tick"));

        let (status, _) = submit(&app, "/x/1/full", b"snap").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(relay.store().get_full(FragmentId::new(1)).await.is_none());
    }

    #[tokio::test]
    async fn non_numeric_fragment_is_rejected() {
        let relay = test_relay();
        let app = build_router(relay.clone());

        let (status, _) = submit(&app, "/x/abc/delta", b"d").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(relay.store().stats().await.fragments, 0);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = Config::default();
        config.server.max_payload_size = 4;
        let relay = test_relay_with(config);
        let app = build_router(relay.clone());

        let (status, _) = submit(&app, "/x/1/delta", b"too large").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(relay.store().get_delta(FragmentId::new(1)).await.is_none());

        let (status, _) = submit(&app, "/x/1/delta", b"ok").await;
        assert_eq!(status, StatusCode::RESET_CONTENT);
    }

    #[tokio::test]
    async fn default_config_accepts_every_delta_after_start() {
        let relay = test_relay();
        let app = build_router(relay.clone());

        let (status, _) = submit(&app, "/x/1/start?tps=60&protocol=3", b"hello").await;
        assert_eq!(status, StatusCode::OK);

        let mut rejected = 0;
        for _ in 0..700 {
            if submit(&app, "/x/1/delta", b"d").await.0 != StatusCode::OK {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 0);

        for _ in 0..200 {
            assert_eq!(fetch(&app, "/match/x/sync").await.0, StatusCode::OK);
        }
        assert_eq!(relay.metrics().rate_limit_hits.load(Ordering::Relaxed), 0);
        assert_eq!(relay.metrics().deltas_total.load(Ordering::Relaxed), 700);
    }

    #[tokio::test]
    async fn ingress_rate_limit_is_per_fragment() {
        let mut config = Config::default();
        config.limits.enabled = true;
        config.limits.ingress_per_fragment_per_second = 2;
        let relay = test_relay_with(config);
        let app = build_router(relay.clone());

        assert_eq!(submit(&app, "/x/1/delta", b"a").await.0, StatusCode::RESET_CONTENT);
        assert_eq!(submit(&app, "/x/1/delta", b"b").await.0, StatusCode::RESET_CONTENT);
        assert_eq!(submit(&app, "/x/1/delta", b"c").await.0, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(submit(&app, "/x/2/delta", b"d").await.0, StatusCode::RESET_CONTENT);

        // The rejected write left the previous delta in place.
        let (_, body) = fetch(&app, "/match/x/1/delta").await;
        assert_eq!(&body[..], b"b");
        assert_eq!(relay.metrics().rate_limit_hits.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn global_rate_limit_applies_to_all_routes() {
        let mut config = Config::default();
        config.limits.enabled = true;
        config.limits.global_requests_per_second = 1;
        let app = build_router(test_relay_with(config));

        assert_eq!(fetch(&app, "/health").await.0, StatusCode::OK);
        assert_eq!(fetch(&app, "/match/x/sync").await.0, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let relay = test_relay();
        let app = build_router(relay);
        submit(&app, "/x/1/start?tps=60&protocol=3", b"s").await;

        let (status, body) = fetch(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["fragments"], 1);
        assert_eq!(health["handshake_received"], true);
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let relay = test_relay();
        let app = build_router(relay);
        submit(&app, "/x/1/full?tick=1", b"full").await;
        fetch(&app, "/match/x/1/full").await;
        fetch(&app, "/match/x/1/delta").await;

        let (status, body) = fetch(&app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("telemetry_relay_submissions_total{kind=\"full\"} 1"));
        assert!(text.contains("telemetry_relay_handshake_resets_total 1"));
        assert!(text.contains("telemetry_relay_fetches_total 2"));
        assert!(text.contains("telemetry_relay_fetch_misses_total 1"));
        assert!(text.contains("telemetry_relay_bytes_sent_total 4"));
        assert!(text.contains("telemetry_relay_stored_bytes 4"));
    }

    #[tokio::test]
    async fn metrics_endpoint_can_be_disabled() {
        let mut config = Config::default();
        config.http.metrics_enabled = false;
        let app = build_router(test_relay_with(config));

        assert_eq!(fetch(&app, "/metrics").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_and_consumers() {
        let relay = test_relay();
        let app = build_router(relay.clone());
        let n = 32;

        let writers: Vec<_> = (0..n)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let payload = format!("snapshot-{i}-").repeat(100);
                    let response = app
                        .oneshot(
                            Request::builder()
                                .method(Method::POST)
                                .uri(format!("/x/{i}/full?tick={i}"))
                                .body(Body::from(payload))
                                .unwrap(),
                        )
                        .await
                        .unwrap();
                    assert_eq!(response.status(), StatusCode::RESET_CONTENT);
                })
            })
            .collect();
        for w in writers {
            w.await.unwrap();
        }

        let readers: Vec<_> = (0..n)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let (status, body) = fetch(&app, &format!("/match/x/{i}/full")).await;
                    assert_eq!(status, StatusCode::OK);
                    assert_eq!(body, Bytes::from(format!("snapshot-{i}-").repeat(100)));
                })
            })
            .collect();
        for r in readers {
            r.await.unwrap();
        }

        let (_, body) = fetch(&app, "/match/x/sync").await;
        let report: SyncReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.fragment, FragmentId::new(n - 1));
        assert_eq!(report.tick, n - 1);
    }
}
