//! Generation-guarded periodic loop
//!
//! A [`Ticker`] owns at most one spawned interval task. Stopping aborts the
//! task synchronously and bumps the generation, so a callback that was
//! already waiting on a lock when the stop happened sees a stale generation
//! and bails out instead of acting on old state.

use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

#[derive(Debug)]
pub struct Ticker {
    name: &'static str,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            handle: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// True while `generation` belongs to the loop that is still running.
    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Replace any running loop with a new one.
    ///
    /// The first tick fires after `first_delay`, then every `period`.
    /// `on_tick` receives this loop's generation and returns `false` to end
    /// the loop.
    pub fn start<F, Fut>(&mut self, first_delay: Duration, period: Duration, on_tick: F)
    where
        F: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.stop();

        let generation = self.generation;
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + first_delay, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !on_tick(generation).await {
                    debug!("{} loop (generation {}) finished", name, generation);
                    break;
                }
            }
        });

        debug!("{} loop started (generation {})", self.name, generation);
        self.handle = Some(handle);
    }

    /// Cancel the loop. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                self.generation = self.generation.wrapping_add(1);
                debug!("{} loop stopped", self.name);
                true
            }
            None => false,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
