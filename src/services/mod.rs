//! External collaborators of the timer core
//!
//! Each collaborator is a trait the engine calls through, plus the concrete
//! implementations shipped with the crate.

pub mod lifecycle;
pub mod notifier;
pub mod session_log;
pub mod store;

// Re-export main types
pub use lifecycle::{AppLifecycle, LifecycleEvent};
pub use notifier::{
    LogDispatcher, Notification, NotificationDispatcher, PermissionOutcome, PermissionState,
};
pub use session_log::{MemorySessionLog, SessionLog, SessionRecord, StoreSessionLog, HISTORY_KEY};
pub use store::{FileStore, MemoryStore, PersistenceStore, SETTINGS_KEY, STATE_KEY};
