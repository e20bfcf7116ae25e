//! Recurring reminder loop
//!
//! The scheduler decides, per tick, whether a reminder should go out and
//! what it says. Suppression is evaluated on every tick rather than at loop
//! start because tier and settings can change mid-session.

use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use super::messages;
use crate::{
    config::EngineConfig,
    services::{Notification, PermissionState},
    state::{ReminderTick, Settings, TimerSnapshot},
    tasks::{NotificationQueue, Ticker},
};

pub const REMINDER_TITLE: &str = "Stay focused";

/// Everything a tick needs to decide on a reminder.
pub struct ReminderContext<'a> {
    pub now_ms: i64,
    pub snapshot: &'a TimerSnapshot,
    pub settings: &'a Settings,
    pub foreground: bool,
    pub notifier: &'a NotificationQueue,
}

/// Why a tick produced no reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    NotCounting,
    NotificationsDisabled,
    Backgrounded,
    GracePeriod,
    PermissionMissing(PermissionState),
    QueueClosed,
}

#[derive(Debug)]
pub struct NotificationScheduler {
    ticker: Ticker,
    period: Duration,
    grace_ms: i64,
}

impl NotificationScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ticker: Ticker::new("reminder"),
            period: config.reminder_period,
            grace_ms: config.grace_period.as_millis() as i64,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.ticker.is_current(generation)
    }

    /// (Re)start the loop: cancel any existing one, fire once now, then
    /// schedule `on_tick` every period.
    pub fn start_loop<F, Fut>(
        &mut self,
        ctx: &ReminderContext<'_>,
        on_tick: F,
    ) -> Result<ReminderTick, Suppression>
    where
        F: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.ticker.stop();
        let fired = self.fire(ctx);
        self.ticker.start(self.period, self.period, on_tick);
        fired
    }

    /// Returns `false` if the loop was not running.
    pub fn stop_loop(&mut self) -> bool {
        self.ticker.stop()
    }

    /// Evaluate suppression, pick a message, and queue it for delivery.
    /// Delivery failures surface in the log, not here.
    pub fn fire(&self, ctx: &ReminderContext<'_>) -> Result<ReminderTick, Suppression> {
        let snapshot = ctx.snapshot;
        if !snapshot.is_counting() {
            return Err(Suppression::NotCounting);
        }
        if !ctx.settings.notifications_enabled {
            return Err(Suppression::NotificationsDisabled);
        }

        if ctx.settings.smart_active() {
            if !ctx.foreground {
                return Err(Suppression::Backgrounded);
            }
            if snapshot.elapsed_ms(ctx.now_ms) < self.grace_ms {
                debug!("Reminder suppressed during grace period");
                return Err(Suppression::GracePeriod);
            }
        }

        let phase_fraction = snapshot.phase_fraction(ctx.now_ms);
        let message = messages::select(
            phase_fraction,
            ctx.settings.tier,
            ctx.settings.smart_notifications_enabled,
            ctx.settings.funny_mode,
        );

        let permission = ctx.notifier.permission_state();
        if permission != PermissionState::Granted {
            debug!("Reminder skipped, notification permission is {}", permission.as_str());
            return Err(Suppression::PermissionMissing(permission));
        }

        if !ctx.notifier.enqueue(Notification::new(REMINDER_TITLE, message)) {
            warn!("Reminder dropped, notification task is gone");
            return Err(Suppression::QueueClosed);
        }

        Ok(ReminderTick {
            fired_at_ms: ctx.now_ms,
            phase_fraction,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DispatchError,
        services::{NotificationDispatcher, PermissionOutcome},
        state::Tier,
    };
    use std::sync::{Arc, Mutex};

    struct Recorder {
        permission: PermissionState,
        sent: Mutex<Vec<Notification>>,
    }

    impl Recorder {
        fn new(permission: PermissionState) -> Arc<Self> {
            Arc::new(Self {
                permission,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl NotificationDispatcher for Recorder {
        fn request_permission(&self) -> PermissionOutcome {
            PermissionOutcome::Granted
        }

        fn permission_state(&self) -> PermissionState {
            self.permission
        }

        fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn scheduler() -> NotificationScheduler {
        NotificationScheduler::new(&EngineConfig::default())
    }

    fn ctx<'a>(
        now_ms: i64,
        snapshot: &'a TimerSnapshot,
        settings: &'a Settings,
        foreground: bool,
        notifier: &'a NotificationQueue,
    ) -> ReminderContext<'a> {
        ReminderContext {
            now_ms,
            snapshot,
            settings,
            foreground,
            notifier,
        }
    }

    #[tokio::test]
    async fn fires_for_counting_timer() {
        let recorder = Recorder::new(PermissionState::Granted);
        let queue = NotificationQueue::spawn(recorder.clone());
        let snapshot = TimerSnapshot::running(100, 0);
        let settings = Settings::default();

        let tick = scheduler()
            .fire(&ctx(50_000, &snapshot, &settings, true, &queue))
            .unwrap();
        assert_eq!(tick.fired_at_ms, 50_000);
        assert!((tick.phase_fraction - 0.5).abs() < 1e-9);
        assert!(messages::SERIOUS.contains(&tick.message.as_str()));

        queue.drain().await;
        assert_eq!(recorder.count(), 1);
        assert_eq!(recorder.sent.lock().unwrap()[0].body, tick.message);
    }

    #[tokio::test]
    async fn paused_timer_never_fires() {
        let recorder = Recorder::new(PermissionState::Granted);
        let queue = NotificationQueue::spawn(recorder.clone());
        let mut snapshot = TimerSnapshot::running(100, 0);
        snapshot.pause_at(10_000);
        let settings = Settings::default();

        let result = scheduler().fire(&ctx(20_000, &snapshot, &settings, true, &queue));
        assert_eq!(result, Err(Suppression::NotCounting));
        queue.drain().await;
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn smart_mode_respects_grace_and_background() {
        let recorder = Recorder::new(PermissionState::Granted);
        let queue = NotificationQueue::spawn(recorder.clone());
        let snapshot = TimerSnapshot::running(100, 0);
        let settings = Settings {
            smart_notifications_enabled: true,
            tier: Tier::Pro,
            ..Settings::default()
        };
        let scheduler = scheduler();

        assert_eq!(
            scheduler.fire(&ctx(4_999, &snapshot, &settings, true, &queue)),
            Err(Suppression::GracePeriod)
        );
        assert_eq!(
            scheduler.fire(&ctx(30_000, &snapshot, &settings, false, &queue)),
            Err(Suppression::Backgrounded)
        );
        assert!(scheduler
            .fire(&ctx(5_000, &snapshot, &settings, true, &queue))
            .is_ok());
    }

    #[tokio::test]
    async fn grace_period_ignored_on_free_tier() {
        let recorder = Recorder::new(PermissionState::Granted);
        let queue = NotificationQueue::spawn(recorder.clone());
        let snapshot = TimerSnapshot::running(100, 0);
        let settings = Settings {
            smart_notifications_enabled: true,
            ..Settings::default()
        };
        assert!(scheduler()
            .fire(&ctx(0, &snapshot, &settings, true, &queue))
            .is_ok());
    }

    #[tokio::test]
    async fn denied_permission_skips_delivery() {
        let recorder = Recorder::new(PermissionState::Denied);
        let queue = NotificationQueue::spawn(recorder.clone());
        let snapshot = TimerSnapshot::running(100, 0);
        let settings = Settings::default();
        assert_eq!(
            scheduler().fire(&ctx(10_000, &snapshot, &settings, true, &queue)),
            Err(Suppression::PermissionMissing(PermissionState::Denied))
        );
        queue.drain().await;
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn disabled_notifications_suppress() {
        let recorder = Recorder::new(PermissionState::Granted);
        let queue = NotificationQueue::spawn(recorder.clone());
        let snapshot = TimerSnapshot::running(100, 0);
        let settings = Settings {
            notifications_enabled: false,
            ..Settings::default()
        };
        assert_eq!(
            scheduler().fire(&ctx(10_000, &snapshot, &settings, true, &queue)),
            Err(Suppression::NotificationsDisabled)
        );
    }

    #[tokio::test]
    async fn stop_loop_twice_is_noop() {
        let recorder = Recorder::new(PermissionState::Granted);
        let queue = NotificationQueue::spawn(recorder.clone());
        let snapshot = TimerSnapshot::running(100, 0);
        let settings = Settings::default();
        let mut scheduler = scheduler();

        let fired = scheduler.start_loop(&ctx(0, &snapshot, &settings, true, &queue), |_| async {
            true
        });
        assert!(fired.is_ok());
        assert!(scheduler.is_running());

        assert!(scheduler.stop_loop());
        assert!(!scheduler.stop_loop());
        assert!(!scheduler.is_running());
    }
}
