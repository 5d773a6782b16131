//! Cooperative shutdown signalling.
//!
//! Long-running loops select on [`Shutdown::wait`] at their suspension
//! points instead of being dropped mid-flight, so they can still release
//! their transport handles. The signal latches: once fired, every later
//! `wait` completes immediately.

use tracing::debug;

/// Fires the paired [`Shutdown`] when triggered or dropped.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: flume::Sender<()>,
}

impl ShutdownTrigger {
    /// Request shutdown.
    pub fn fire(self) {
        debug!("shutdown requested");
        drop(self.tx);
    }
}

/// Receiving side of a shutdown signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: flume::Receiver<()>,
    // Held only by `never()`, keeps the channel connected forever.
    _keepalive: Option<flume::Sender<()>>,
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = flume::bounded(0);
        Self {
            rx,
            _keepalive: Some(tx),
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.rx.is_disconnected()
    }

    /// Complete once shutdown has been requested.
    pub async fn wait(&self) {
        // Nothing is ever sent: the only way out is disconnection.
        let _ = self.rx.recv_async().await;
    }
}

/// Create a connected trigger/signal pair.
#[must_use]
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = flume::bounded(0);
    (
        ShutdownTrigger { tx },
        Shutdown {
            rx,
            _keepalive: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;

    #[test]
    fn test_fire_latches() {
        let (trigger, shutdown) = shutdown_channel();
        let copy = shutdown.clone();
        assert!(!shutdown.is_triggered());

        trigger.fire();
        assert!(shutdown.is_triggered());
        block_on(shutdown.wait());
        block_on(shutdown.wait());
        block_on(copy.wait());
    }

    #[test]
    fn test_drop_trigger_fires() {
        let (trigger, shutdown) = shutdown_channel();
        drop(trigger);
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_never_stays_pending() {
        let shutdown = Shutdown::never();
        assert!(!shutdown.is_triggered());
        assert!(shutdown.wait().now_or_never().is_none());
    }
}
