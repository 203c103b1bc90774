//! Shutdown signaling for pipeline stages.
//!
//! Abstracts a tokio watch channel into a one-shot broadcast: the signal is
//! created once at pipeline construction, transitions from "open" to
//! "closed" at most once from the observers' point of view, and is read (not
//! owned) by every stage. Unlike mpsc channels, all receivers observe the
//! same event.

use tokio::sync::watch;

/// Transmitter side of the pipeline shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Broadcasts the shutdown signal to every receiver.
    ///
    /// Idempotent: firing an already-fired signal is not an error and has no
    /// further visible effect. Fails only when no receiver is left alive.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver observing this signal.
    ///
    /// A receiver created after the signal has fired will not report the
    /// past event through [`ShutdownRx::changed`], so stages must obtain
    /// their receiver at construction time and hold on to it.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of the pipeline shutdown signal.
pub type ShutdownRx = watch::Receiver<()>;

/// Creates the shutdown channel shared by all pipeline stages.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());

    (ShutdownTx(tx), rx)
}

/// Outcome of an operation that races against the shutdown signal.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum ShutdownResult<T, E> {
    /// The operation completed before shutdown fired.
    Ok(T),
    /// Shutdown fired; carries whatever the operation had accumulated so
    /// the caller can decide its fate.
    Shutdown(E),
}
