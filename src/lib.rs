//! Focus Timer - a crash-safe focus countdown with off-screen reminders
//!
//! This library provides the timer state machine, the reminder scheduler it
//! drives, and the collaborators they talk to (persistence, notifications,
//! session history, app lifecycle).

pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::{CliArgs, EngineConfig};
pub use engine::{Collaborators, RecoveryOutcome, TimerEngine};
pub use error::TimerError;
pub use state::{Settings, Tier, TimerEvent, TimerPhase, TimerSnapshot, TimerView};
pub use utils::shutdown_signal;
