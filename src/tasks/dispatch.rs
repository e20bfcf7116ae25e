//! Notification delivery background task
//!
//! The engine decides what to send while it holds its state lock, then hands
//! the [`Notification`] to this queue. Delivery happens on a blocking thread
//! in enqueue order, so a slow platform never holds up the countdown.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::services::{Notification, NotificationDispatcher, PermissionState};

enum Job {
    Deliver(Notification),
    Drain(oneshot::Sender<()>),
}

/// Ordered, fire-and-forget handoff to a [`NotificationDispatcher`].
pub struct NotificationQueue {
    dispatcher: Arc<dyn NotificationDispatcher>,
    tx: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<()>,
}

impl NotificationQueue {
    /// Spawn the delivery task. Must be called inside a tokio runtime.
    pub fn spawn(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(dispatch_task(Arc::clone(&dispatcher), rx));
        Self {
            dispatcher,
            tx,
            handle,
        }
    }

    pub fn permission_state(&self) -> PermissionState {
        self.dispatcher.permission_state()
    }

    /// Queue a notification. Returns `false` if the delivery task is gone.
    pub fn enqueue(&self, notification: Notification) -> bool {
        if self.tx.send(Job::Deliver(notification)).is_err() {
            warn!("Notification task has stopped, dropping notification");
            return false;
        }
        true
    }

    /// Wait until everything queued so far has been handed to the dispatcher.
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Drain(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Background task that delivers queued notifications one at a time
async fn dispatch_task(
    dispatcher: Arc<dyn NotificationDispatcher>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    debug!("Starting notification task");
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Deliver(notification) => {
                let dispatcher = Arc::clone(&dispatcher);
                let title = notification.title.clone();
                match tokio::task::spawn_blocking(move || dispatcher.dispatch(&notification)).await
                {
                    Ok(Ok(())) => debug!("Delivered notification '{}'", title),
                    Ok(Err(e)) => warn!("Failed to dispatch '{}': {}", title, e),
                    Err(e) => error!("Notification delivery task failed: {}", e),
                }
            }
            Job::Drain(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("Notification queue closed, stopping notification task");
}
