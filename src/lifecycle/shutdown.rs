//! Shutdown broadcast shared by the server and the signal listener.

use tokio::sync::broadcast;

/// Cloneable stop switch. Every clone triggers the same channel; the server
/// holds a receiver and the signal listener holds a clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Wake every receiver. Triggering with no receivers left is a no-op.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Receivers that have not been dropped yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
