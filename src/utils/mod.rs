//! Utility functions module
//!
//! Clock sources, the debounced persistence writer, and signal handling.

pub mod clock;
pub mod debounce;
pub mod signals;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::Debounced;
pub use signals::shutdown_signal;
