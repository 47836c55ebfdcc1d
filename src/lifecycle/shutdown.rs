//! Shutdown coordination.
//!
//! A `watch` channel rather than a broadcast: a server that subscribes after
//! the trigger still sees it, so a signal arriving during startup is not lost.

use tokio::sync::watch;

/// Owner side: created once in `main`, triggered on SIGINT/SIGTERM.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Hand a signal to one long-running server.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Ask every subscribed server to stop. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Server side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered, or once the [`Shutdown`] is dropped.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let a = tokio::spawn(shutdown.subscribe().wait());
        let b = tokio::spawn(shutdown.subscribe().wait());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            a.await.unwrap();
            b.await.unwrap();
        })
        .await
        .expect("subscribers not woken");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), shutdown.subscribe().wait())
            .await
            .expect("trigger before subscribe was lost");
    }

    #[tokio::test]
    async fn dropping_owner_releases_subscribers() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        drop(shutdown);

        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("signal outlived its owner");
    }

    #[tokio::test]
    async fn untriggered_signal_stays_pending() {
        let shutdown = Shutdown::new();
        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown.subscribe().wait()).await;
        assert!(waited.is_err());
        assert!(!shutdown.is_triggered());
    }
}
