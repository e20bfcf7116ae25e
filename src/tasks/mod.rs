//! Background tasks module
//!
//! This module contains the periodic loop primitive, the notification
//! delivery task and the lifecycle subscription task that run alongside the
//! engine.

pub mod dispatch;
pub mod lifecycle;
pub mod ticker;

// Re-export main types
pub use dispatch::NotificationQueue;
pub use lifecycle::{lifecycle_task, subscribe_lifecycle, LifecycleSubscription};
pub use ticker::Ticker;
