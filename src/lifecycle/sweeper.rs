//! Periodic removal of expired CSRF tokens and rate-limit records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::security::{CsrfManager, RateLimiter};

/// Sweep both stores every `interval` until shutdown.
pub fn spawn_sweeper(
    csrf: Arc<CsrfManager>,
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let tokens = csrf.sweep();
                    let records = limiter.sweep();
                    tracing::debug!(tokens, records, "Swept expired entries");
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Sweeper stopping");
                    break;
                }
            }
        }
    })
}
