//! Tick clock.

use cellsim_core::{ClockConfig, Result};
use std::time::Duration;
use tracing::debug;

/// Counts ticks and converts the speed factor into a wall-clock interval.
///
/// The speed factor only changes how often ticks fire, never what a tick does.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    base_hz: f64,
    speed_factor: f64,
    tick: u64,
    running: bool,
}

impl SimulationClock {
    pub fn new(config: &ClockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            base_hz: config.base_hz,
            speed_factor: config.speed_factor,
            tick: 0,
            running: false,
        })
    }

    /// Time between ticks at the current speed. Construction and
    /// `set_speed_factor` keep it within the accepted interval bounds.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / (self.base_hz * self.speed_factor))
    }

    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    pub fn set_speed_factor(&mut self, speed_factor: f64) -> Result<()> {
        ClockConfig {
            base_hz: self.base_hz,
            speed_factor,
        }
        .validate()?;
        debug!(
            old = self.speed_factor,
            new = speed_factor,
            "Clock speed changed"
        );
        self.speed_factor = speed_factor;
        Ok(())
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stopping is the only form of cancellation; ticks are never interrupted.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Index the next fired tick will carry
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Fire one tick and return its index. The first tick is 0.
    pub fn advance(&mut self) -> u64 {
        let fired = self.tick;
        self.tick += 1;
        fired
    }
}
