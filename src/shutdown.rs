//! Cancellation signal for the worker and reporter loops.
//!
//! The binary never fires it; the generator runs until the process is
//! killed. Embedders and tests use it to bound a run.

use tokio::sync::watch;

/// Fires the signal. Dropping the trigger does not fire it.
#[derive(Debug)]
pub struct Trigger {
    tx: watch::Sender<bool>,
}

/// Observes the signal. Cheap to clone, one per loop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/observer pair.
pub fn channel() -> (Trigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (Trigger { tx }, Shutdown { rx })
}

impl Trigger {
    /// Ask every loop to stop.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    /// An observer whose signal can never fire.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Closed while still `false`: `wait` pends forever.
        drop(tx);
        Self { rx }
    }

    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal fires. Pends forever if the trigger is gone
    /// without having fired.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
