//! Background cleanup task for rate limiter state.
//!
//! Runs periodically to drop idle fragments from the keyed ingress limiter.
//! Stored payloads are never evicted.

use crate::config::CleanupConfig;
use crate::limits::RateLimits;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    rate_limits: RateLimits,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Cleanup task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));
        // The first tick completes immediately.
        timer.tick().await;

        loop {
            timer.tick().await;

            let before = rate_limits.ingress_keys_count();
            rate_limits.shrink();
            let after = rate_limits.ingress_keys_count();

            if before > after {
                tracing::info!("Cleanup: evicted {} idle fragment limiters", before - after);
            } else {
                tracing::debug!("Cleanup: no idle fragment limiters");
            }
        }
    })
}
