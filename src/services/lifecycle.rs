//! App foreground/background notifications

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    Foreground,
    Background,
}

/// Broadcasts lifecycle transitions to any number of subscribers.
#[derive(Debug, Clone)]
pub struct AppLifecycle {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl AppLifecycle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Publish a transition. Returns how many subscribers received it.
    pub fn notify(&self, event: LifecycleEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("Lifecycle event {:?} had no subscribers", event);
                0
            }
        }
    }
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
