//! Cooperative cancellation shared by a processor and its connections.

use tokio::sync::watch;

/// Fires the paired `CancellationSignal`s.
#[derive(Debug)]
pub struct CancellationTrigger {
    sender: watch::Sender<bool>,
}

impl CancellationTrigger {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Observed by long-running loops. Clones observe the same trigger.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

/// A trigger and a signal observing it.
pub fn cancellation() -> (CancellationTrigger, CancellationSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancellationTrigger { sender }, CancellationSignal { receiver })
}

impl CancellationSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancelled. Pending forever if the trigger was dropped unfired.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
