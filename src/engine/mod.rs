//! Timer core
//!
//! The countdown state machine, the reminder scheduler it drives, and the
//! message selector the scheduler consults.

pub mod messages;
pub mod scheduler;
pub mod timer;

// Re-export main types
pub use scheduler::{NotificationScheduler, ReminderContext, Suppression};
pub use timer::{Collaborators, LoopStatus, RecoveryOutcome, TimerEngine};
