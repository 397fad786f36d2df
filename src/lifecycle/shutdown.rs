//! Shutdown coordination.
//!
//! `main` owns one [`Shutdown`]; the signal task triggers it and every
//! long-running piece (HTTP listener, TLS drain task, store sweeper) waits on
//! its own subscription.

use std::future::Future;

use tokio::sync::broadcast;

/// Broadcast-backed shutdown trigger. Clones share the same channel.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for tasks that `select!` on shutdown alongside other work.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Future resolving on trigger, for `with_graceful_shutdown` style APIs.
    ///
    /// Subscribes immediately, so a trigger between this call and the first
    /// poll is not missed.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    pub fn trigger(&self) {
        let listeners = self.tx.send(()).unwrap_or(0);
        tracing::info!(listeners, "Shutdown triggered");
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_sees_trigger_before_first_poll() {
        let shutdown = Shutdown::new();
        let waiting = shutdown.wait();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("wait did not resolve");
    }

    #[test]
    fn test_trigger_without_listeners_is_harmless() {
        Shutdown::new().trigger();
    }
}
