//! Timer engine: the countdown state machine
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> Completed -> Idle
//! ```
//!
//! [`TimerEngine`] is a cheap clonable handle. All mutable state lives in one
//! [`Core`] behind a single async mutex; both periodic loops (the countdown
//! re-evaluation and the reminder scheduler) take that same lock and check
//! their generation before acting, so once `pause()` or `stop()` returns no
//! tick can observe the old running state. Notifications are decided under
//! the lock and delivered by a [`NotificationQueue`] outside it.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::scheduler::{NotificationScheduler, ReminderContext, Suppression};
use crate::{
    config::EngineConfig,
    error::{CorruptStateError, PersistenceError, TimerError},
    services::{
        AppLifecycle, Notification, NotificationDispatcher, PermissionOutcome, PermissionState,
        PersistenceStore, SessionLog, SessionRecord, SETTINGS_KEY, STATE_KEY,
    },
    state::{
        ReminderTick, Settings, SnapshotRecord, TimerEvent, TimerPhase, TimerSnapshot, TimerView,
        MAX_DURATION_SECS,
    },
    tasks::{subscribe_lifecycle, LifecycleSubscription, NotificationQueue, Ticker},
    utils::{Clock, Debounced},
};

pub const COMPLETION_TITLE: &str = "Focus session complete";

/// The engine's external collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn PersistenceStore>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub session_log: Arc<dyn SessionLog>,
}

/// Result of [`TimerEngine::restore`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// Nothing persisted, or an idle snapshot
    Fresh,
    /// A running timer was reattached to its persisted origin
    Resumed { remaining_secs: u64 },
    /// A paused timer was restored as paused
    Paused { remaining_secs: u64 },
    /// The timer ran out while the process was dead
    Completed(SessionRecord),
    /// The persisted snapshot was invalid and has been discarded
    Reset(CorruptStateError),
    /// A timer is already active in this process
    Skipped,
}

/// Which periodic loops currently exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStatus {
    pub countdown: bool,
    pub reminders: bool,
}

struct Core {
    snapshot: TimerSnapshot,
    settings: Settings,
    foreground: bool,
    countdown: Ticker,
    scheduler: NotificationScheduler,
    snapshot_writer: Debounced,
}

struct Shared {
    core: Mutex<Core>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn PersistenceStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    notifications: NotificationQueue,
    session_log: Arc<dyn SessionLog>,
    config: EngineConfig,
    events_tx: broadcast::Sender<TimerEvent>,
    view_tx: watch::Sender<TimerView>,
}

/// Handle to the process-wide timer. Construct once and clone it into
/// whatever drives the UI.
#[derive(Clone)]
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl TimerEngine {
    /// Create an idle engine. Call [`restore`](Self::restore) to pick up
    /// persisted settings and any timer that survived a restart.
    ///
    /// Spawns the notification task, so this must run inside a tokio runtime.
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        let (view_tx, _) = watch::channel(TimerView {
            foreground: true,
            ..TimerView::default()
        });

        let core = Core {
            snapshot: TimerSnapshot::idle(),
            settings: Settings::default(),
            foreground: true,
            countdown: Ticker::new("countdown"),
            scheduler: NotificationScheduler::new(&config),
            snapshot_writer: Debounced::new(STATE_KEY, config.persist_debounce),
        };

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                clock: collaborators.clock,
                store: collaborators.store,
                notifications: NotificationQueue::spawn(Arc::clone(&collaborators.dispatcher)),
                dispatcher: collaborators.dispatcher,
                session_log: collaborators.session_log,
                config,
                events_tx,
                view_tx,
            }),
        }
    }

    /// Load settings and recover the persisted timer.
    ///
    /// A running snapshot whose time ran out is completed without ever
    /// publishing a running view. A paused snapshot missing its pause
    /// instant is discarded rather than guessed at.
    pub async fn restore(&self) -> RecoveryOutcome {
        let shared = &self.shared;
        let mut core = shared.core.lock().await;
        if core.snapshot.is_running {
            warn!("Restore requested while a timer is active, ignoring");
            return RecoveryOutcome::Skipped;
        }

        core.settings = shared.load_settings();
        let now = shared.now();

        let raw = match shared.store.get(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted timer state");
                return RecoveryOutcome::Fresh;
            }
            Err(e) => {
                error!("Failed to read timer state, starting fresh: {}", e);
                return RecoveryOutcome::Fresh;
            }
        };

        let snapshot = match SnapshotRecord::from_json(&raw).and_then(SnapshotRecord::into_snapshot) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Discarding corrupt timer state: {}", e);
                shared.clear_persisted(&mut core, now);
                shared.emit(TimerEvent::Discarded {
                    reason: e.to_string(),
                });
                shared.publish(&core, now);
                return RecoveryOutcome::Reset(e);
            }
        };

        match (snapshot.phase(), snapshot.start_epoch_ms) {
            (TimerPhase::Paused, _) => {
                core.snapshot = snapshot;
                let remaining_secs = snapshot.remaining_secs(now);
                info!("Restored paused timer with {}s remaining", remaining_secs);
                shared.publish(&core, now);
                RecoveryOutcome::Paused { remaining_secs }
            }
            (TimerPhase::Running, Some(start_ms)) => {
                if snapshot.remaining_ms(now) <= 0 {
                    info!("Timer expired while the app was closed, completing");
                    core.snapshot = snapshot;
                    RecoveryOutcome::Completed(shared.finish(&mut core, now))
                } else {
                    shared.begin(&mut core, snapshot.duration_secs, start_ms, true);
                    let remaining_secs = core.snapshot.remaining_secs(shared.now());
                    info!("Resumed running timer with {}s remaining", remaining_secs);
                    RecoveryOutcome::Resumed { remaining_secs }
                }
            }
            _ => RecoveryOutcome::Fresh,
        }
    }

    /// Start a fresh countdown of `duration_secs` from now.
    pub async fn start(&self, duration_secs: u64) -> Result<(), TimerError> {
        if duration_secs == 0 {
            return Err(TimerError::InvalidDuration {
                max: MAX_DURATION_SECS,
            });
        }
        self.launch(duration_secs, None).await
    }

    /// Start a countdown whose origin is `origin_ms` rather than now.
    ///
    /// Used to reattach to a persisted running timer; an origin far enough
    /// in the past completes the timer immediately.
    pub async fn start_from(&self, duration_secs: u64, origin_ms: i64) -> Result<(), TimerError> {
        self.launch(duration_secs, Some(origin_ms)).await
    }

    async fn launch(&self, duration_secs: u64, origin_ms: Option<i64>) -> Result<(), TimerError> {
        if duration_secs > MAX_DURATION_SECS {
            return Err(TimerError::InvalidDuration {
                max: MAX_DURATION_SECS,
            });
        }
        let mut core = self.shared.core.lock().await;
        if core.snapshot.is_running {
            return Err(TimerError::AlreadyRunning);
        }
        let origin = origin_ms.unwrap_or_else(|| self.shared.now());
        self.shared
            .begin(&mut core, duration_secs, origin, origin_ms.is_some());
        Ok(())
    }

    /// Pause a counting timer. `Ok(false)` if there was nothing to pause.
    pub async fn pause(&self) -> Result<bool, TimerError> {
        let mut core = self.shared.core.lock().await;
        self.shared.pause_locked(&mut core)
    }

    /// Resume a paused timer. `Ok(false)` if it was not paused.
    pub async fn resume(&self) -> Result<bool, TimerError> {
        let mut core = self.shared.core.lock().await;
        Ok(self.shared.resume_locked(&mut core))
    }

    pub async fn toggle_pause(&self) -> Result<bool, TimerError> {
        let mut core = self.shared.core.lock().await;
        if core.snapshot.is_paused {
            Ok(self.shared.resume_locked(&mut core))
        } else {
            self.shared.pause_locked(&mut core)
        }
    }

    /// Cancel the timer without recording a session.
    pub async fn stop(&self) -> Result<bool, TimerError> {
        let shared = &self.shared;
        let mut core = shared.core.lock().await;
        if !core.snapshot.is_running {
            return Ok(false);
        }
        let now = shared.now();
        if shared.settle(&mut core, now) {
            return Ok(false);
        }
        if core.settings.lock_active() {
            return Err(shared.blocked("stop"));
        }

        core.countdown.stop();
        core.scheduler.stop_loop();
        core.snapshot = TimerSnapshot::idle();
        shared.clear_persisted(&mut core, now);

        info!("Timer cancelled");
        shared.emit(TimerEvent::Stopped);
        shared.publish(&core, now);
        Ok(true)
    }

    /// Force completion of an active timer. Returns the recorded session.
    pub async fn complete(&self) -> Option<SessionRecord> {
        let mut core = self.shared.core.lock().await;
        if !core.snapshot.is_running {
            return None;
        }
        let now = self.shared.now();
        Some(self.shared.finish(&mut core, now))
    }

    /// Re-evaluate the countdown once, completing it if time is up.
    /// Returns whether the timer is still counting.
    pub async fn evaluate(&self) -> bool {
        let mut core = self.shared.core.lock().await;
        self.shared.evaluate(&mut core)
    }

    /// Apply an app foreground/background transition.
    pub async fn set_foreground(&self, foreground: bool) {
        let shared = &self.shared;
        let mut core = shared.core.lock().await;
        let now = shared.now();
        let changed = core.foreground != foreground;
        core.foreground = foreground;

        if !foreground {
            if core.scheduler.stop_loop() {
                debug!("App backgrounded, reminders stopped");
            }
            shared.checkpoint(&mut core, now);
        } else if changed && !shared.settle(&mut core, now) && core.snapshot.is_counting() {
            shared.start_reminders(&mut core, now);
        }

        shared.publish(&core, now);
    }

    /// Change settings, persist them, and restart a running reminder loop
    /// so the change applies without waiting out the current period.
    pub async fn update_settings<F>(&self, update: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let shared = &self.shared;
        let mut core = shared.core.lock().await;
        let before = core.settings.clone();
        update(&mut core.settings);
        if core.settings == before {
            return before;
        }

        shared.save_settings(&core.settings);
        if core.scheduler.is_running() && core.snapshot.is_counting() && core.foreground {
            debug!("Settings changed mid-session, restarting reminders");
            let now = shared.now();
            shared.start_reminders(&mut core, now);
        }
        core.settings.clone()
    }

    pub async fn settings(&self) -> Settings {
        self.shared.core.lock().await.settings.clone()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.shared.core.lock().await.snapshot
    }

    /// Current view, completing the timer first if it has run out.
    pub async fn view(&self) -> TimerView {
        let shared = &self.shared;
        let mut core = shared.core.lock().await;
        let now = shared.now();
        shared.settle(&mut core, now);
        TimerView::of(&core.snapshot, now, core.foreground)
    }

    pub async fn loop_status(&self) -> LoopStatus {
        let core = self.shared.core.lock().await;
        LoopStatus {
            countdown: core.countdown.is_running(),
            reminders: core.scheduler.is_running(),
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<TimerView> {
        self.shared.view_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Ask the platform for notification permission. Denial is a normal
    /// outcome; reminders are then silently skipped.
    pub async fn request_notification_permission(&self) -> PermissionOutcome {
        let dispatcher = Arc::clone(&self.shared.dispatcher);
        match tokio::task::spawn_blocking(move || dispatcher.request_permission()).await {
            Ok(outcome) => {
                info!("Notification permission {:?}", outcome);
                outcome
            }
            Err(e) => {
                error!("Notification permission request failed: {}", e);
                PermissionOutcome::Denied
            }
        }
    }

    pub fn permission_state(&self) -> PermissionState {
        self.shared.dispatcher.permission_state()
    }

    /// Wait until every notification queued so far reached the dispatcher.
    pub async fn drain_notifications(&self) {
        self.shared.notifications.drain().await;
    }

    /// Write the current snapshot immediately.
    pub async fn flush(&self) {
        let mut core = self.shared.core.lock().await;
        let now = self.shared.now();
        self.shared.checkpoint(&mut core, now);
    }

    /// Follow foreground/background events until the subscription is dropped.
    pub fn attach_lifecycle(&self, lifecycle: &AppLifecycle) -> LifecycleSubscription {
        subscribe_lifecycle(self.clone(), lifecycle.subscribe())
    }
}

impl Shared {
    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn publish(&self, core: &Core, now: i64) {
        self.view_tx
            .send_replace(TimerView::of(&core.snapshot, now, core.foreground));
    }

    fn blocked(&self, operation: &'static str) -> TimerError {
        warn!("{} blocked by lock mode", operation);
        self.emit(TimerEvent::Blocked {
            operation: operation.to_string(),
        });
        TimerError::Locked { operation }
    }

    fn begin(self: &Arc<Self>, core: &mut Core, duration_secs: u64, origin_ms: i64, resumed: bool) {
        let now = self.now();
        core.snapshot = TimerSnapshot::running(duration_secs, origin_ms);
        if core.snapshot.remaining_ms(now) <= 0 {
            info!("Timer origin already expired, completing");
            self.finish(core, now);
            return;
        }

        self.start_countdown(core);
        self.checkpoint(core, now);

        info!(
            "Timer started: {}s total, {}s remaining",
            duration_secs,
            core.snapshot.remaining_secs(now)
        );
        self.emit(TimerEvent::Started {
            duration_secs,
            start_epoch_ms: origin_ms,
            resumed,
        });
        self.publish(core, now);

        if core.foreground {
            self.start_reminders(core, now);
        }
    }

    fn pause_locked(&self, core: &mut Core) -> Result<bool, TimerError> {
        if !core.snapshot.is_counting() {
            debug!("Pause ignored, timer is {:?}", core.snapshot.phase());
            return Ok(false);
        }
        let now = self.now();
        if self.settle(core, now) {
            return Ok(false);
        }
        if core.settings.lock_active() {
            return Err(self.blocked("pause"));
        }

        core.countdown.stop();
        core.scheduler.stop_loop();
        core.snapshot.pause_at(now);
        self.checkpoint(core, now);

        let remaining_secs = core.snapshot.remaining_secs(now);
        info!("Timer paused with {}s remaining", remaining_secs);
        self.emit(TimerEvent::Paused { remaining_secs });
        self.publish(core, now);
        Ok(true)
    }

    fn resume_locked(self: &Arc<Self>, core: &mut Core) -> bool {
        if !(core.snapshot.is_running && core.snapshot.is_paused) {
            debug!("Resume ignored, timer is {:?}", core.snapshot.phase());
            return false;
        }

        let now = self.now();
        let paused_ms = core.snapshot.resume_at(now);
        self.start_countdown(core);
        self.checkpoint(core, now);

        let remaining_secs = core.snapshot.remaining_secs(now);
        info!(
            "Timer resumed after {}ms paused, {}s remaining",
            paused_ms, remaining_secs
        );
        self.emit(TimerEvent::Resumed {
            remaining_secs,
            paused_ms,
        });
        self.publish(core, now);

        if core.foreground {
            self.start_reminders(core, now);
        }
        true
    }

    /// Complete a counting timer whose time is up. Returns whether it did.
    fn settle(&self, core: &mut Core, now: i64) -> bool {
        if core.snapshot.is_counting() && core.snapshot.remaining_ms(now) <= 0 {
            self.finish(core, now);
            return true;
        }
        false
    }

    fn evaluate(&self, core: &mut Core) -> bool {
        if !core.snapshot.is_counting() {
            return false;
        }
        let now = self.now();
        if self.settle(core, now) {
            return false;
        }
        self.persist(core, now);
        self.publish(core, now);
        true
    }

    fn finish(&self, core: &mut Core, now: i64) -> SessionRecord {
        core.countdown.stop();
        core.scheduler.stop_loop();

        let finished = core.snapshot;
        let session = SessionRecord {
            start_time: finished.start_epoch_ms.unwrap_or(now),
            end_time: now,
            duration: finished.duration_secs,
            completed: true,
        };

        core.snapshot = TimerSnapshot::idle();
        self.clear_persisted(core, now);

        if core.settings.notifications_enabled {
            self.notify_completion(finished.duration_secs);
        }
        if let Err(e) = self.session_log.append(&session) {
            error!("Failed to record finished session: {}", e);
        }

        info!("Focus session complete ({}s)", finished.duration_secs);
        self.emit(TimerEvent::Completed {
            session: session.clone(),
        });
        self.view_tx
            .send_replace(TimerView::completed(finished.duration_secs, core.foreground));
        self.publish(core, now);
        session
    }

    fn notify_completion(&self, duration_secs: u64) {
        let permission = self.notifications.permission_state();
        if permission != PermissionState::Granted {
            debug!(
                "Completion notice skipped, permission is {}",
                permission.as_str()
            );
            return;
        }

        let body = if duration_secs >= 60 {
            format!("{} minutes of focus done. Welcome back.", duration_secs / 60)
        } else {
            format!("{} seconds of focus done. Welcome back.", duration_secs)
        };
        if !self
            .notifications
            .enqueue(Notification::new(COMPLETION_TITLE, body))
        {
            warn!("Completion notice dropped, notification task is gone");
        }
    }

    fn start_countdown(self: &Arc<Self>, core: &mut Core) {
        let weak = Arc::downgrade(self);
        let period = self.config.tick_interval;
        core.countdown.start(period, period, move |generation: u64| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(shared) => shared.countdown_tick(generation).await,
                    None => false,
                }
            }
        });
    }

    async fn countdown_tick(&self, generation: u64) -> bool {
        let mut core = self.core.lock().await;
        if !core.countdown.is_current(generation) {
            debug!("Dropping stale countdown tick");
            return false;
        }
        self.evaluate(&mut core)
    }

    fn start_reminders(self: &Arc<Self>, core: &mut Core, now: i64) {
        let weak = Arc::downgrade(self);
        let on_tick = move |generation: u64| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(shared) => shared.reminder_tick(generation).await,
                    None => false,
                }
            }
        };

        let Core {
            snapshot,
            settings,
            foreground,
            scheduler,
            ..
        } = core;
        let ctx = ReminderContext {
            now_ms: now,
            snapshot: &*snapshot,
            settings: &*settings,
            foreground: *foreground,
            notifier: &self.notifications,
        };
        let fired = scheduler.start_loop(&ctx, on_tick);
        self.report_reminder(fired);
    }

    async fn reminder_tick(&self, generation: u64) -> bool {
        let core = self.core.lock().await;
        if !core.scheduler.is_current(generation) {
            debug!("Dropping stale reminder tick");
            return false;
        }
        let ctx = ReminderContext {
            now_ms: self.now(),
            snapshot: &core.snapshot,
            settings: &core.settings,
            foreground: core.foreground,
            notifier: &self.notifications,
        };
        let fired = core.scheduler.fire(&ctx);
        self.report_reminder(fired);
        true
    }

    fn report_reminder(&self, fired: Result<ReminderTick, Suppression>) {
        match fired {
            Ok(tick) => self.emit(TimerEvent::Reminder(tick)),
            Err(reason) => debug!("No reminder this tick: {:?}", reason),
        }
    }

    fn encode(&self, core: &Core, now: i64) -> Option<String> {
        match serde_json::to_string(&core.snapshot.to_record(now)) {
            Ok(json) => Some(json),
            Err(e) => {
                error!("Failed to encode timer state: {}", e);
                None
            }
        }
    }

    /// Debounced write for the 1 Hz loop.
    fn persist(&self, core: &mut Core, now: i64) {
        let Some(json) = self.encode(core, now) else {
            return;
        };
        if let Err(e) = core.snapshot_writer.submit(self.store.as_ref(), json, now) {
            warn!("Failed to persist timer state, will retry: {}", e);
        }
    }

    /// Immediate write for recovery checkpoints.
    fn checkpoint(&self, core: &mut Core, now: i64) {
        if !core.snapshot.is_running {
            self.clear_persisted(core, now);
            return;
        }
        let Some(json) = self.encode(core, now) else {
            return;
        };
        let store = self.store.as_ref();
        let writer = &mut core.snapshot_writer;
        let written = match writer.submit(store, json, now) {
            Ok(true) => Ok(true),
            Ok(false) => writer.flush(store, now),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Failed to checkpoint timer state, will retry: {}", e);
        }
    }

    fn clear_persisted(&self, core: &mut Core, now: i64) {
        if let Err(e) = core.snapshot_writer.clear(self.store.as_ref(), now) {
            warn!("Failed to clear persisted timer state: {}", e);
        }
    }

    fn load_settings(&self) -> Settings {
        match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable settings: {}", e);
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                error!("Failed to read settings: {}", e);
                Settings::default()
            }
        }
    }

    fn save_settings(&self, settings: &Settings) {
        let result = serde_json::to_string(settings)
            .map_err(PersistenceError::from)
            .and_then(|json| self.store.set(SETTINGS_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist settings: {}", e);
        }
    }
}
