//! Per-job cancellation handle

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation flag; every clone observes the same request
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation. Returns `true` only for the first request.
    pub fn cancel(&self) -> bool {
        self.sender.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as self, so the wait cannot fail
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
