use std::sync::Arc;

use tokio::sync::watch;

/// A handle to shut down the server. All [`ShutdownListener`]s created from the same `Shutdown`
/// are notified once [`terminate`] is called.
///
/// [`terminate`]: Self::terminate
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);

        Self { tx: Arc::new(tx) }
    }

    pub fn listen(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Sends the shutdown signal to all listeners.
    pub fn terminate(&self) {
        log::debug!(
            "Sending shutdown signal to {} listeners",
            self.tx.receiver_count()
        );

        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Returns `true` if the shutdown signal was already sent.
    pub fn is_active(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the shutdown signal is sent. Returns immediately if it was already sent.
    pub async fn recv(&mut self) {
        while !*self.rx.borrow_and_update() {
            // The sender is never dropped while the state is alive.
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
