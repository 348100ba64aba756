use std::time::Duration;

use tokio::sync::watch;

/// Caller side of a cancellation pair.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Creates a handle and the signal it controls.
    pub fn new() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, AbortSignal { rx })
    }

    /// Requests cancellation. Calling it again has no further effect.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Fires the signal once `deadline` has elapsed.
    pub fn abort_after(&self, deadline: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            handle.abort();
        })
    }

    /// Returns another signal observing this handle.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Pump side of a cancellation pair.
///
/// If every `AbortHandle` is dropped without aborting, the signal never fires.
#[derive(Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal with no handle.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
