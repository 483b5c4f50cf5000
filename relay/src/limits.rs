//! Rate limiting for telemetry-relay.
//!
//! Two limiters guard the relay:
//! - a keyed limiter per [`FragmentId`] for producer submissions, so one
//!   runaway producer cannot starve the others
//! - a direct limiter across every request the relay serves
//!
//! Both use the governor crate; the keyed limiter is backed by DashMap.
//! Unless `limits.enabled` is set, every check passes and no keys are
//! tracked.

use crate::config::LimitsConfig;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use relay_types::FragmentId;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for the relay server.
#[derive(Clone)]
pub struct RateLimits {
    enabled: bool,

    /// Limits start/full/delta submissions per fragment.
    ingress_limiter: Arc<KeyedLimiter<FragmentId>>,

    /// Limits all requests across all clients.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("enabled", &self.enabled)
            .field("ingress_limiter", &"KeyedLimiter<FragmentId>")
            .field("tracked_fragments", &self.ingress_limiter.len())
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// Zero quotas are rejected by [`Config::validate`](crate::config::Config::validate);
    /// if one slips through it is raised to 1.
    pub fn new(config: &LimitsConfig) -> Self {
        let ingress_rate =
            NonZeroU32::new(config.ingress_per_fragment_per_second).unwrap_or(NonZeroU32::MIN);
        let global_rate =
            NonZeroU32::new(config.global_requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            enabled: config.enabled,
            ingress_limiter: Arc::new(RateLimiter::keyed(Quota::per_second(ingress_rate))),
            global_limiter: Arc::new(RateLimiter::direct(Quota::per_second(global_rate))),
        }
    }

    /// Check if a producer submission for `fragment` is allowed.
    pub fn check_ingress(&self, fragment: FragmentId) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }
        self.ingress_limiter
            .check_key(&fragment)
            .map_err(|_| RateLimitError::IngressLimitExceeded(fragment))
    }

    /// Check if the global request rate is within limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Get the number of tracked fragment keys (for metrics).
    pub fn ingress_keys_count(&self) -> usize {
        self.ingress_limiter.len()
    }

    /// Evict idle fragments from the keyed limiter.
    ///
    /// Fragments whose cells have fully recharged are dropped. Called
    /// periodically from the cleanup task.
    pub fn shrink(&self) {
        self.ingress_limiter.retain_recent();
        self.ingress_limiter.shrink_to_fit();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Too many submissions for one fragment.
    #[error("ingress rate limit exceeded for fragment {0}")]
    IngressLimitExceeded(FragmentId),
    /// Global request rate exceeded across all clients.
    #[error("global rate limit exceeded")]
    GlobalLimitExceeded,
}
