// Tailer Cancellation Token

use tokio::sync::watch;

/// Cancellation signal shared by every tailer of a run
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested
    ///
    /// Returns immediately if it already was. A dropped sender counts as a
    /// shutdown request so orphaned tailers never outlive their group.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to all tailers. Idempotent.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let (tx, token) = shutdown_channel();
        let mut waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        assert!(!token.is_shutdown());
        tx.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter not woken")
            .unwrap();
        assert!(token.is_shutdown());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (tx, mut token) = shutdown_channel();
        tx.shutdown();
        tx.shutdown();
        assert!(tx.is_shutdown());
        // already signalled: returns without blocking
        token.cancelled().await;
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_dropped_sender_releases_waiters() {
        let (tx, mut token) = shutdown_channel();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("waiter not released");
    }
}
