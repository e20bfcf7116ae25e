//! Events broadcast by the timer engine

use serde::{Deserialize, Serialize};

use crate::services::SessionRecord;

/// Ephemeral record of a reminder that reached the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderTick {
    pub fired_at_ms: i64,
    pub phase_fraction: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    Started {
        duration_secs: u64,
        start_epoch_ms: i64,
        /// Reattached to a persisted origin rather than started fresh
        resumed: bool,
    },
    Paused {
        remaining_secs: u64,
    },
    Resumed {
        remaining_secs: u64,
        paused_ms: i64,
    },
    Stopped,
    Completed {
        session: SessionRecord,
    },
    Reminder(ReminderTick),
    /// A pause or stop was refused by lock mode
    Blocked {
        operation: String,
    },
    /// A persisted snapshot was discarded during recovery
    Discarded {
        reason: String,
    },
}
