//! Lifecycle subscription background task

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{engine::TimerEngine, services::LifecycleEvent};

/// Keeps the engine following lifecycle events. Dropping it unsubscribes.
#[derive(Debug)]
pub struct LifecycleSubscription {
    handle: JoinHandle<()>,
}

impl LifecycleSubscription {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for LifecycleSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn [`lifecycle_task`] for `engine`.
pub fn subscribe_lifecycle(
    engine: TimerEngine,
    events: broadcast::Receiver<LifecycleEvent>,
) -> LifecycleSubscription {
    LifecycleSubscription {
        handle: tokio::spawn(lifecycle_task(engine, events)),
    }
}

/// Background task that forwards foreground/background transitions to the engine
pub async fn lifecycle_task(engine: TimerEngine, mut events: broadcast::Receiver<LifecycleEvent>) {
    info!("Starting lifecycle task");

    loop {
        match events.recv().await {
            Ok(event) => {
                debug!("Lifecycle event: {:?}", event);
                engine
                    .set_foreground(event == LifecycleEvent::Foreground)
                    .await;
            }
            Err(RecvError::Lagged(skipped)) => {
                // The next recv yields the oldest retained event; later ones
                // still arrive in order, so the final state is correct.
                warn!("Lifecycle task lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Lifecycle source closed, stopping lifecycle task");
                break;
            }
        }
    }
}
