//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::state::{Settings, Tier};

/// Timing knobs for the engine and its loops
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Countdown re-evaluation period
    pub tick_interval: Duration,
    /// Time between reminders while the timer runs in the foreground
    pub reminder_period: Duration,
    /// Smart-mode quiet window after the timer starts
    pub grace_period: Duration,
    /// Minimum spacing of routine snapshot writes
    pub persist_debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            reminder_period: Duration::from_secs(60),
            grace_period: Duration::from_secs(5),
            persist_debounce: Duration::from_secs(1),
        }
    }
}

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "focus-timer")]
#[command(about = "Run a focus session that reminds you to stay off-screen")]
#[command(version)]
pub struct CliArgs {
    /// Session length in minutes
    #[arg(short, long, default_value = "25")]
    pub minutes: u64,

    /// Seconds between reminders
    #[arg(short, long, default_value = "60")]
    pub reminder_secs: u64,

    /// Smart-mode quiet window after start, in seconds
    #[arg(long, default_value = "5")]
    pub grace_secs: u64,

    /// Directory for settings, timer state and session history
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Use the funny reminder set
    #[arg(long)]
    pub funny: bool,

    /// Enable pro-tier features
    #[arg(long)]
    pub pro: bool,

    /// Block pause and cancel while running (pro)
    #[arg(long)]
    pub lock: bool,

    /// Phase-aware reminders with a grace window (pro)
    #[arg(long)]
    pub smart: bool,

    /// Disable reminders entirely
    #[arg(long)]
    pub no_notifications: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            reminder_period: Duration::from_secs(self.reminder_secs.max(1)),
            grace_period: Duration::from_secs(self.grace_secs),
            ..EngineConfig::default()
        }
    }

    /// Resolve the state directory, defaulting to the platform data dir
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("focus-timer")
        })
    }

    /// Overlay command-line flags on stored settings
    pub fn apply_to(&self, settings: &mut Settings) {
        if self.funny {
            settings.funny_mode = true;
        }
        if self.pro {
            settings.tier = Tier::Pro;
        }
        if self.lock {
            settings.timer_lock_enabled = true;
        }
        if self.smart {
            settings.smart_notifications_enabled = true;
        }
        if self.no_notifications {
            settings.notifications_enabled = false;
        }
    }
}
