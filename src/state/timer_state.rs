//! Observable timer state for renderers

use serde::{Deserialize, Serialize};

use super::TimerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
    /// Published once when a countdown finishes, immediately followed by Idle
    Completed,
}

/// What a UI needs to draw the timer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub phase: TimerPhase,
    pub duration_secs: u64,
    pub remaining_secs: u64,
    pub phase_fraction: f64,
    pub foreground: bool,
}

impl TimerView {
    /// Create a view of `snapshot` at `now_ms`
    pub fn of(snapshot: &TimerSnapshot, now_ms: i64, foreground: bool) -> Self {
        Self {
            phase: snapshot.phase(),
            duration_secs: snapshot.duration_secs,
            remaining_secs: snapshot.remaining_secs(now_ms),
            phase_fraction: snapshot.phase_fraction(now_ms),
            foreground,
        }
    }

    /// Create the one-off view published when a countdown finishes
    pub fn completed(duration_secs: u64, foreground: bool) -> Self {
        Self {
            phase: TimerPhase::Completed,
            duration_secs,
            remaining_secs: 0,
            phase_fraction: 1.0,
            foreground,
        }
    }

    /// Check if a countdown is in progress (running or paused)
    pub fn is_active(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Paused)
    }

    /// Format remaining time as `MM:SS`, or `H:MM:SS` past an hour
    pub fn remaining_label(&self) -> String {
        let hours = self.remaining_secs / 3600;
        let minutes = (self.remaining_secs % 3600) / 60;
        let seconds = self.remaining_secs % 60;

        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }
}
