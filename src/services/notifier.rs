//! Notification dispatch contract and a tracing-backed implementation

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DispatchError;

/// What the platform currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Undetermined => "undetermined",
        }
    }
}

/// Terminal result of a permission request. Denied is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

/// A user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Platform notification surface.
///
/// `request_permission` and `dispatch` run on a blocking thread and may take
/// their time. `permission_state` is read under the engine lock and should be
/// a cheap lookup.
pub trait NotificationDispatcher: Send + Sync {
    /// May block while the user answers a prompt.
    fn request_permission(&self) -> PermissionOutcome;
    fn permission_state(&self) -> PermissionState;
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Writes notifications to the log. Always permitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn request_permission(&self) -> PermissionOutcome {
        PermissionOutcome::Granted
    }

    fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        info!("🔔 {}: {}", notification.title, notification.body);
        Ok(())
    }
}
