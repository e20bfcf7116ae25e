//! Reminder message selection
//!
//! Without smart notifications the tone is picked by funny mode alone. With
//! smart notifications on the pro tier the tone follows the session: early
//! on the user gets encouragement, in the middle a mix, and near the end
//! the direct lines.

use rand::{seq::SliceRandom, Rng};

use crate::state::Tier;

pub const FUNNY: &[&str] = &[
    "Your phone called. It wants some alone time.",
    "Plot twist: the screen misses nothing while you're away.",
    "Put the rectangle down. Slowly. Nobody gets hurt.",
    "Your thumbs have filed for a break. Grant it.",
    "Scrolling won't make the timer go faster. We checked.",
    "The internet will still be there. Probably.",
];

pub const SERIOUS: &[&str] = &[
    "Stay off your screen until the timer ends.",
    "Put your device down and return to your task.",
    "You committed to this session. Keep going.",
    "Focus time is still running. Step away from the screen.",
    "Close the app and get back to what matters.",
];

pub const MOTIVATIONAL: &[&str] = &[
    "Great start. Settle in and let the focus build.",
    "Every minute off-screen is a minute for yourself.",
    "You're building momentum. Keep it up.",
    "Deep work starts now. You've got this.",
    "Small steps, steady progress.",
];

/// Smart-mode boundary below which only encouragement is used
pub const EARLY_PHASE_END: f64 = 0.3;
/// Smart-mode boundary from which only the direct lines are used
pub const LATE_PHASE_START: f64 = 0.7;

/// Every message that may be picked for these inputs.
pub fn candidates(
    phase_fraction: f64,
    tier: Tier,
    smart_enabled: bool,
    funny_mode: bool,
) -> Vec<&'static str> {
    let tone = if funny_mode { FUNNY } else { SERIOUS };

    if !(smart_enabled && tier == Tier::Pro) {
        return tone.to_vec();
    }

    let phase = if phase_fraction.is_nan() {
        0.0
    } else {
        phase_fraction.clamp(0.0, 1.0)
    };

    if phase < EARLY_PHASE_END {
        MOTIVATIONAL.to_vec()
    } else if phase < LATE_PHASE_START {
        tone.iter().chain(MOTIVATIONAL).copied().collect()
    } else {
        tone.to_vec()
    }
}

/// Pick a reminder uniformly from [`candidates`].
pub fn select(phase_fraction: f64, tier: Tier, smart_enabled: bool, funny_mode: bool) -> &'static str {
    select_with(
        &mut rand::thread_rng(),
        phase_fraction,
        tier,
        smart_enabled,
        funny_mode,
    )
}

pub fn select_with<R: Rng + ?Sized>(
    rng: &mut R,
    phase_fraction: f64,
    tier: Tier,
    smart_enabled: bool,
    funny_mode: bool,
) -> &'static str {
    candidates(phase_fraction, tier, smart_enabled, funny_mode)
        .choose(rng)
        .copied()
        .unwrap_or(SERIOUS[0])
}
