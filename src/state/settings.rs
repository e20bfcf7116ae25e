//! User settings that shape reminders and lock mode

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

/// Persisted under the `timer_settings` key.
///
/// `timer_lock_enabled` and `smart_notifications_enabled` are stored as the
/// user chose them but only take effect on the pro tier; use
/// [`Settings::lock_active`] and [`Settings::smart_active`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub notifications_enabled: bool,
    pub funny_mode: bool,
    pub timer_lock_enabled: bool,
    pub smart_notifications_enabled: bool,
    pub tier: Tier,
}

impl Settings {
    pub fn lock_active(&self) -> bool {
        self.timer_lock_enabled && self.tier == Tier::Pro
    }

    pub fn smart_active(&self) -> bool {
        self.smart_notifications_enabled && self.tier == Tier::Pro
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            funny_mode: false,
            timer_lock_enabled: false,
            smart_notifications_enabled: false,
            tier: Tier::Free,
        }
    }
}
