//! Simple signaling primitives for coordination with waiters.
//!
//! Abstracts tokio's watch channels into signal types that carry no payload.
//! The poll client uses one to announce that at least one record has been
//! emitted, which lets tests and liveness checks detect progress without
//! polling the sink.

use tokio::sync::watch;

/// Transmitter side of a coordination signal channel.
pub type SignalTx = watch::Sender<()>;

/// Receiver side of a coordination signal channel.
///
/// Await [`watch::Receiver::changed`] to observe the next signal.
pub type SignalRx = watch::Receiver<()>;

/// Creates a new coordination signal channel.
///
/// All receivers subscribed at send time observe the same signal. Receivers
/// created later only observe subsequent signals.
pub fn create_signal() -> (SignalTx, SignalRx) {
    let (tx, rx) = watch::channel(());
    (tx, rx)
}
