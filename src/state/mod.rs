//! State management module
//!
//! This module contains the persisted snapshot and settings, and the views
//! and events the engine publishes.

pub mod events;
pub mod settings;
pub mod snapshot;
pub mod timer_state;

// Re-export main types
pub use events::{ReminderTick, TimerEvent};
pub use settings::{Settings, Tier};
pub use snapshot::{SnapshotRecord, TimerSnapshot, MAX_DURATION_SECS};
pub use timer_state::{TimerPhase, TimerView};
