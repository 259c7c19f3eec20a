//! Cooperative shutdown signal for blocking receives.

use tokio::sync::watch;
use tracing::info;

/// Trigger side of a shutdown signal.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a shutdown signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle and signal, initially not triggered.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

impl ShutdownHandle {
    /// Request shutdown. Every waiting receiver wakes.
    pub fn trigger(&self) {
        info!("Shutdown requested");
        self.tx.send_replace(true);
    }

    /// Another observer of this handle.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    ///
    /// Also returns if the handle is dropped, since no trigger can follow.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_waiter() {
        let (handle, mut signal) = shutdown_channel();
        assert!(!signal.is_triggered());

        let waiter = tokio::spawn(async move {
            signal.wait().await;
            signal.is_triggered()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();
        assert!(waiter.await.unwrap());
    }

    #[test]
    fn test_wait_pending_until_trigger() {
        let (handle, mut signal) = shutdown_channel();
        let mut wait = tokio_test::task::spawn(signal.wait());
        tokio_test::assert_pending!(wait.poll());
        handle.trigger();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn test_already_triggered_returns_immediately() {
        let (handle, _signal) = shutdown_channel();
        handle.trigger();
        let mut late = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_handle_releases_waiter() {
        let (handle, mut signal) = shutdown_channel();
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
        assert!(!signal.is_triggered());
    }
}
