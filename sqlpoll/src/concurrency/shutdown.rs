//! Broadcast shutdown signaling for the poll loop.
//!
//! A single [`ShutdownTx`] can stop any number of subscribed receivers. The
//! poll loop checks the signal between cycles and waits on it during the
//! inter-cycle sleep, so a stop request takes effect within one poll interval
//! and is never reported as a failure.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Broadcasts the shutdown signal to all subscribed receivers.
    ///
    /// Fails only when every receiver has already been dropped, in which case
    /// there is nothing left to stop.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<bool>> {
        self.0.send(true)
    }

    /// Creates a new receiver subscribed to this shutdown channel.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Returns whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until shutdown is requested.
    ///
    /// A dropped transmitter counts as a shutdown request, so orphaned
    /// receivers never wait forever.
    pub async fn wait_for_shutdown(&mut self) {
        let _ = self.0.wait_for(|shutdown| *shutdown).await;
    }
}

/// Creates a new shutdown channel in the "running" state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_shutdown_observed_by_all_subscribers() {
        let (tx, mut rx1) = create_shutdown_channel();
        let mut rx2 = tx.subscribe();

        assert!(!rx1.is_shutdown());
        assert!(!rx2.is_shutdown());

        tx.shutdown().unwrap();

        rx1.wait_for_shutdown().await;
        rx2.wait_for_shutdown().await;
        assert!(rx1.is_shutdown());
        assert!(rx2.is_shutdown());
    }

    #[tokio::test]
    async fn test_dropped_transmitter_unblocks_waiters() {
        let (tx, mut rx) = create_shutdown_channel();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), rx.wait_for_shutdown())
            .await
            .expect("waiter should unblock when the transmitter is dropped");
    }
}
