//! Focus Timer - terminal front-end
//!
//! Runs one focus session: resumes a session that survived a previous run,
//! otherwise starts a new one, and logs reminders until it completes.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use focus_timer::{
    config::CliArgs,
    engine::{Collaborators, RecoveryOutcome, TimerEngine},
    services::{FileStore, LogDispatcher, PermissionOutcome, PersistenceStore, StoreSessionLog},
    state::{TimerEvent, TimerPhase},
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_timer={}", args.log_level()))
        .init();

    info!("Starting focus-timer v{}", env!("CARGO_PKG_VERSION"));

    let state_dir = args.state_dir();
    let store: Arc<dyn PersistenceStore> = Arc::new(
        FileStore::new(&state_dir)
            .with_context(|| format!("Failed to open state directory {}", state_dir.display()))?,
    );
    let history = Arc::new(StoreSessionLog::new(Arc::clone(&store)));

    let engine = TimerEngine::new(
        Collaborators {
            clock: Arc::new(SystemClock),
            store,
            dispatcher: Arc::new(LogDispatcher),
            session_log: history.clone(),
        },
        args.engine_config(),
    );
    let mut events = engine.subscribe_events();
    let mut view_rx = engine.subscribe_view();

    if engine.request_notification_permission().await == PermissionOutcome::Denied {
        warn!("Notifications are not permitted, reminders will be skipped");
    }

    let outcome = engine.restore().await;
    let settings = engine.update_settings(|settings| args.apply_to(settings)).await;
    info!(
        "State: {}, tier={:?}, funny={}, lock={}, smart={}",
        state_dir.display(),
        settings.tier,
        settings.funny_mode,
        settings.lock_active(),
        settings.smart_active()
    );

    match outcome {
        RecoveryOutcome::Resumed { remaining_secs } => {
            info!("Resuming previous session, {}s left", remaining_secs);
        }
        RecoveryOutcome::Paused { remaining_secs } => {
            info!("Previous session was paused with {}s left, resuming", remaining_secs);
            engine.resume().await?;
        }
        RecoveryOutcome::Completed(session) => {
            info!(
                "Your previous {}-minute session finished while the timer was closed",
                session.duration / 60
            );
            engine.drain_notifications().await;
            return Ok(());
        }
        RecoveryOutcome::Reset(reason) => {
            warn!("Previous session could not be recovered ({}), starting fresh", reason);
            engine.start(args.minutes.saturating_mul(60)).await?;
        }
        RecoveryOutcome::Fresh | RecoveryOutcome::Skipped => {
            engine.start(args.minutes.saturating_mul(60)).await?;
        }
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut last_announced = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(TimerEvent::Completed { session }) => {
                    info!("Session complete: {} minutes focused", session.duration / 60);
                    break;
                }
                Ok(TimerEvent::Blocked { operation }) => {
                    info!("Lock mode is on, {} is not available", operation);
                }
                Ok(other) => debug!("Timer event: {:?}", other),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} timer events", skipped),
                Err(RecvError::Closed) => break,
            },
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = *view_rx.borrow_and_update();
                let minute = view.remaining_secs / 60;
                if view.phase == TimerPhase::Running
                    && view.remaining_secs % 60 == 0
                    && last_announced != Some(minute)
                {
                    last_announced = Some(minute);
                    info!("{} remaining", view.remaining_label());
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, saving timer state");
                engine.set_foreground(false).await;
                break;
            }
        }
    }

    engine.drain_notifications().await;
    match history.completed_sessions() {
        Ok(count) => info!("Completed sessions so far: {}", count),
        Err(e) => warn!("Failed to read session history: {}", e),
    }

    info!("focus-timer exiting");
    Ok(())
}
