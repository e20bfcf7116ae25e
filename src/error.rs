//! Error taxonomy for the timer core
//!
//! Engine operations only ever return [`TimerError`]. Collaborator failures
//! are logged at the engine boundary and swallowed.

use thiserror::Error;

/// Top-level error for timer engine operations.
#[derive(Error, Debug)]
pub enum TimerError {
    /// Operation refused because pro-tier lock mode is active
    #[error("{operation} is blocked while lock mode is active")]
    Locked { operation: &'static str },

    /// Zero, or too long to express in epoch milliseconds
    #[error("duration must be between 1 and {max} seconds")]
    InvalidDuration { max: u64 },

    /// Only one timer may run per process
    #[error("a timer is already running")]
    AlreadyRunning,
}

impl TimerError {
    /// True for policy refusals the UI should show passively.
    pub fn is_locked(&self) -> bool {
        matches!(self, TimerError::Locked { .. })
    }
}

/// Failures reading or writing the key-value store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("failed to write '{key}': {reason}")]
    Write { key: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures handing a notification to the platform.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("notification dispatch failed: {0}")]
    Failed(String),
}

/// A persisted snapshot that cannot be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorruptStateError {
    #[error("snapshot is not valid JSON: {0}")]
    Unreadable(String),

    #[error("snapshot is paused but not running")]
    PausedWhileIdle,

    #[error("running snapshot has no start time")]
    MissingStart,

    #[error("paused snapshot has no pause time")]
    MissingPause,

    #[error("start time {0} precedes the epoch")]
    StartBeforeEpoch(i64),

    #[error("duration {0}s is out of range")]
    DurationOutOfRange(u64),

    #[error("pause time {pause_ms} precedes start time {start_ms}")]
    PauseBeforeStart { start_ms: i64, pause_ms: i64 },
}
