//! Session keep-alive monitor
//!
//! A released-once signal tied to one channel session. It does not poll or ping; the
//! host waits on it to stay parked until the connection ends.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct KeepAliveMonitor {
    released: Arc<watch::Sender<bool>>,
}

impl KeepAliveMonitor {
    /// Start a monitor for a new session
    pub fn start() -> Self {
        let (released, _) = watch::channel(false);
        Self {
            released: Arc::new(released),
        }
    }

    /// Release every waiter; returns false if already released
    pub fn release(&self) -> bool {
        self.released.send_if_modified(|released| {
            if *released {
                false
            } else {
                *released = true;
                true
            }
        })
    }

    pub fn is_released(&self) -> bool {
        *self.released.borrow()
    }

    /// Wait until the session ends
    pub async fn wait(&self) {
        let mut receiver = self.released.subscribe();
        // The sender lives as long as `self`, so this only returns once released
        let _ = receiver.wait_for(|released| *released).await;
    }
}
