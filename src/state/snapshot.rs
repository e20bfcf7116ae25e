//! Timer snapshot: the minimal state needed to rebuild progress after restart
//!
//! Remaining time is never stored as a counter. It is derived from
//! `start_epoch_ms` and the clock, so missed ticks (backgrounding, OS
//! suspension) cannot make it drift. Resuming shifts `start_epoch_ms` forward
//! by the paused span, which keeps every calculation a single subtraction.

use serde::{Deserialize, Serialize};

use super::TimerPhase;
use crate::error::CorruptStateError;

/// Longest countdown whose length still fits in epoch milliseconds
pub const MAX_DURATION_SECS: u64 = (i64::MAX / 1000) as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerSnapshot {
    pub is_running: bool,
    pub is_paused: bool,
    pub duration_secs: u64,
    pub start_epoch_ms: Option<i64>,
    pub pause_epoch_ms: Option<i64>,
}

impl TimerSnapshot {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(duration_secs: u64, start_epoch_ms: i64) -> Self {
        Self {
            is_running: true,
            is_paused: false,
            duration_secs,
            start_epoch_ms: Some(start_epoch_ms),
            pause_epoch_ms: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        match (self.is_running, self.is_paused) {
            (false, _) => TimerPhase::Idle,
            (true, false) => TimerPhase::Running,
            (true, true) => TimerPhase::Paused,
        }
    }

    /// Running and not paused.
    pub fn is_counting(&self) -> bool {
        self.is_running && !self.is_paused
    }

    pub fn duration_ms(&self) -> i64 {
        i64::try_from(self.duration_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }

    /// Active time so far. Frozen at the pause instant while paused.
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let Some(start) = self.start_epoch_ms else {
            return 0;
        };
        let until = match (self.is_paused, self.pause_epoch_ms) {
            (true, Some(pause)) => pause,
            _ => now_ms,
        };
        until.saturating_sub(start).max(0)
    }

    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        if !self.is_running {
            return 0;
        }
        self.duration_ms()
            .saturating_sub(self.elapsed_ms(now_ms))
            .max(0)
    }

    /// Whole seconds, rounded up so "0" only shows once time is really up.
    pub fn remaining_secs(&self, now_ms: i64) -> u64 {
        let remaining = self.remaining_ms(now_ms) as u64;
        remaining.div_ceil(1000)
    }

    /// elapsed / duration clamped to `[0, 1]`; zero duration yields 0.
    pub fn phase_fraction(&self, now_ms: i64) -> f64 {
        let duration = self.duration_ms();
        if duration <= 0 {
            return 0.0;
        }
        (self.elapsed_ms(now_ms) as f64 / duration as f64).clamp(0.0, 1.0)
    }

    pub fn pause_at(&mut self, now_ms: i64) {
        self.is_paused = true;
        self.pause_epoch_ms = Some(now_ms);
    }

    /// Shift the origin past the paused span and clear the pause.
    /// Returns the paused duration.
    pub fn resume_at(&mut self, now_ms: i64) -> i64 {
        let paused_ms = self
            .pause_epoch_ms
            .map(|pause| now_ms.saturating_sub(pause).max(0))
            .unwrap_or(0);
        if let Some(start) = self.start_epoch_ms.as_mut() {
            *start = start.saturating_add(paused_ms);
        }
        self.is_paused = false;
        self.pause_epoch_ms = None;
        paused_ms
    }

    /// `is_paused ⇒ is_running` and `start_epoch_ms.is_none() ⇔ !is_running`.
    pub fn is_consistent(&self) -> bool {
        (!self.is_paused || self.is_running)
            && (self.start_epoch_ms.is_none() == !self.is_running)
            && (self.pause_epoch_ms.is_some() == self.is_paused)
    }

    pub fn to_record(&self, now_ms: i64) -> SnapshotRecord {
        SnapshotRecord {
            is_running: self.is_running,
            is_paused: self.is_paused,
            duration: self.duration_secs,
            remaining_time: self.is_running.then(|| self.remaining_secs(now_ms)),
            start_time: self.start_epoch_ms,
            pause_time: self.pause_epoch_ms,
        }
    }
}

/// On-disk form of [`TimerSnapshot`] under the `timer_state` key.
///
/// `remainingTime` is a hint for humans and older readers; the authoritative
/// value is recomputed from `startTime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub is_running: bool,
    #[serde(default)]
    pub is_paused: bool,
    pub duration: u64,
    #[serde(default)]
    pub remaining_time: Option<u64>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub pause_time: Option<i64>,
}

impl SnapshotRecord {
    pub fn from_json(raw: &str) -> Result<Self, CorruptStateError> {
        serde_json::from_str(raw).map_err(|e| CorruptStateError::Unreadable(e.to_string()))
    }

    /// Validate and convert. Never guesses a missing pause instant.
    pub fn into_snapshot(self) -> Result<TimerSnapshot, CorruptStateError> {
        if !self.is_running {
            if self.is_paused {
                return Err(CorruptStateError::PausedWhileIdle);
            }
            return Ok(TimerSnapshot::idle());
        }

        if self.duration > MAX_DURATION_SECS {
            return Err(CorruptStateError::DurationOutOfRange(self.duration));
        }
        let start_ms = self.start_time.ok_or(CorruptStateError::MissingStart)?;
        if start_ms < 0 {
            return Err(CorruptStateError::StartBeforeEpoch(start_ms));
        }
        if !self.is_paused {
            return Ok(TimerSnapshot::running(self.duration, start_ms));
        }

        let pause_ms = self.pause_time.ok_or(CorruptStateError::MissingPause)?;
        if pause_ms < start_ms {
            return Err(CorruptStateError::PauseBeforeStart { start_ms, pause_ms });
        }

        Ok(TimerSnapshot {
            is_running: true,
            is_paused: true,
            duration_secs: self.duration,
            start_epoch_ms: Some(start_ms),
            pause_epoch_ms: Some(pause_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_derived_from_start() {
        let snapshot = TimerSnapshot::running(10, 1_000);
        assert_eq!(snapshot.remaining_ms(1_000), 10_000);
        assert_eq!(snapshot.remaining_ms(4_500), 6_500);
        assert_eq!(snapshot.remaining_ms(16_000), 0);
    }

    #[test]
    fn extreme_origins_saturate() {
        let snapshot = TimerSnapshot::running(60, i64::MIN);
        assert_eq!(snapshot.elapsed_ms(i64::MAX), i64::MAX);
        assert_eq!(snapshot.remaining_ms(i64::MAX), 0);

        let mut paused = TimerSnapshot::running(60, i64::MAX - 10);
        paused.pause_at(i64::MAX);
        assert_eq!(paused.resume_at(i64::MIN), 0);
        assert_eq!(paused.start_epoch_ms, Some(i64::MAX - 10));
    }

    #[test]
    fn oversized_duration_does_not_wrap() {
        let snapshot = TimerSnapshot::running(u64::MAX, 0);
        assert_eq!(snapshot.duration_ms(), i64::MAX);
        assert!(snapshot.remaining_ms(1_000) > 0);
        assert_eq!(
            TimerSnapshot::running(MAX_DURATION_SECS, 0).duration_ms(),
            MAX_DURATION_SECS as i64 * 1000
        );
    }

    #[test]
    fn remaining_secs_rounds_up() {
        let snapshot = TimerSnapshot::running(10, 0);
        assert_eq!(snapshot.remaining_secs(9_001), 1);
        assert_eq!(snapshot.remaining_secs(9_999), 1);
        assert_eq!(snapshot.remaining_secs(10_000), 0);
        assert_eq!(snapshot.remaining_secs(500), 10);
    }

    #[test]
    fn pause_freezes_and_resume_shifts_origin() {
        let mut snapshot = TimerSnapshot::running(100, 0);
        snapshot.pause_at(10_000);
        assert_eq!(snapshot.remaining_ms(60_000), 90_000);

        let paused = snapshot.resume_at(60_000);
        assert_eq!(paused, 50_000);
        assert_eq!(snapshot.start_epoch_ms, Some(50_000));
        assert_eq!(snapshot.remaining_ms(60_000), 90_000);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn phase_fraction_is_clamped() {
        let snapshot = TimerSnapshot::running(100, 0);
        assert_eq!(snapshot.phase_fraction(0), 0.0);
        assert!((snapshot.phase_fraction(30_000) - 0.3).abs() < 1e-9);
        assert_eq!(snapshot.phase_fraction(500_000), 1.0);
        assert_eq!(snapshot.phase_fraction(-5_000), 0.0);

        assert_eq!(TimerSnapshot::running(0, 0).phase_fraction(1_000), 0.0);
        assert_eq!(TimerSnapshot::idle().phase_fraction(1_000), 0.0);
    }

    #[test]
    fn invariants_hold_for_constructors() {
        assert!(TimerSnapshot::idle().is_consistent());
        assert!(TimerSnapshot::running(5, 0).is_consistent());

        let broken = TimerSnapshot {
            is_running: false,
            is_paused: true,
            ..TimerSnapshot::idle()
        };
        assert!(!broken.is_consistent());
    }

    #[test]
    fn four_field_record_loads_as_running() {
        let record =
            SnapshotRecord::from_json(r#"{"isRunning":true,"duration":60,"remainingTime":10,"startTime":5000}"#)
                .unwrap();
        assert_eq!(record.into_snapshot().unwrap(), TimerSnapshot::running(60, 5_000));
    }

    #[test]
    fn paused_record_without_pause_time_is_corrupt() {
        let record = SnapshotRecord {
            is_running: true,
            is_paused: true,
            duration: 60,
            remaining_time: None,
            start_time: Some(0),
            pause_time: None,
        };
        assert_eq!(record.into_snapshot(), Err(CorruptStateError::MissingPause));
    }

    #[test]
    fn running_record_without_start_is_corrupt() {
        let record = SnapshotRecord {
            is_running: true,
            is_paused: false,
            duration: 60,
            remaining_time: Some(60),
            start_time: None,
            pause_time: None,
        };
        assert_eq!(record.into_snapshot(), Err(CorruptStateError::MissingStart));
    }

    #[test]
    fn implausible_records_are_corrupt() {
        let negative = SnapshotRecord::from_json(
            r#"{"isRunning":true,"duration":60,"startTime":-9223372036854775808}"#,
        )
        .unwrap();
        assert_eq!(
            negative.into_snapshot(),
            Err(CorruptStateError::StartBeforeEpoch(i64::MIN))
        );

        let huge = SnapshotRecord::from_json(
            r#"{"isRunning":true,"duration":18446744073709551615,"startTime":0}"#,
        )
        .unwrap();
        assert_eq!(
            huge.into_snapshot(),
            Err(CorruptStateError::DurationOutOfRange(u64::MAX))
        );
    }

    #[test]
    fn garbage_is_unreadable() {
        assert!(matches!(
            SnapshotRecord::from_json("not json"),
            Err(CorruptStateError::Unreadable(_))
        ));
    }

    #[test]
    fn record_keeps_pause_fields() {
        let mut snapshot = TimerSnapshot::running(60, 1_000);
        snapshot.pause_at(11_000);
        let record = snapshot.to_record(20_000);
        assert_eq!(record.remaining_time, Some(50));
        assert_eq!(record.pause_time, Some(11_000));
        assert_eq!(record.into_snapshot().unwrap(), snapshot);
    }
}
