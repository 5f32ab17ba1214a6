//! Background pruning of the window store.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::limiter::RateLimiter;
use crate::observability::metrics;

/// Prune `limiter`'s store every `interval` until shutdown fires.
pub fn spawn_sweeper(
    limiter: RateLimiter,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.prune();
                    let remaining = limiter.store().len();
                    metrics::record_prune(removed, remaining);
                    tracing::debug!(removed, remaining, "Pruned window store");
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Sweeper stopping");
                    break;
                }
            }
        }
    })
}
