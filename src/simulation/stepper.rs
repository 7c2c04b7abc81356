//! Fixed-rate driver for the roundabout
//!
//! One step is one simulation tick. Vehicles are generated at a cadence
//! derived from the car flow, and a frame is due every `time_factor` steps.

use std::time::Duration;

use log::info;

use super::roundabout::Roundabout;
use super::types::{TimeFactor, Viewport, TICK_RATE};

/// Ticks between two generated vehicles for `car_flow` vehicles per minute
pub fn spawn_interval(car_flow: u32) -> u32 {
    if car_flow == 0 {
        return u32::MAX;
    }
    (TICK_RATE * 60 / car_flow).max(1)
}

/// What happened during one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The stepper is paused, nothing moved
    Paused,
    Stepped {
        /// A new vehicle was generated before the tick
        spawned: bool,
        /// Vehicles that left the simulation during the tick
        disposed: usize,
        /// A renderer should draw this step
        render: bool,
    },
}

/// Drives a [`Roundabout`] tick by tick
#[derive(Debug, Clone)]
pub struct Stepper {
    loop_count: u64,
    time_factor: TimeFactor,
    paused: bool,
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new()
    }
}

impl Stepper {
    /// A stepper starts paused
    pub fn new() -> Self {
        Self {
            loop_count: 0,
            time_factor: TimeFactor::Normal,
            paused: true,
        }
    }

    pub fn start(&mut self) {
        if self.paused {
            info!("Simulation started");
            self.paused = false;
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            info!("Simulation paused");
            self.paused = true;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Run one tick, generating a vehicle first when one is due
    pub fn step(&mut self, roundabout: &mut Roundabout) -> StepOutcome {
        if self.paused {
            return StepOutcome::Paused;
        }

        let render = self.loop_count % u64::from(self.time_factor.value()) == 0;

        let spawned = self.loop_count % u64::from(roundabout.spawn_interval()) == 0
            && roundabout.generate_vehicle().is_some();

        let disposed = roundabout.calculate();
        self.loop_count += 1;

        StepOutcome::Stepped {
            spawned,
            disposed,
            render,
        }
    }

    /// Wall-clock time between two steps
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(1000 / self.time_factor.value() / TICK_RATE))
    }

    /// Switch between normal and fast mode, for the stepper and the roundabout
    pub fn set_time_factor(&mut self, time_factor: TimeFactor, roundabout: &mut Roundabout) {
        self.time_factor = time_factor;
        roundabout.set_time_factor(time_factor);
    }

    pub fn time_factor(&self) -> TimeFactor {
        self.time_factor
    }

    /// The drawing surface changed size: pause and rescale
    ///
    /// The caller decides when to start again.
    pub fn resize(&mut self, viewport: Viewport, roundabout: &mut Roundabout) {
        self.pause();
        roundabout.set_viewport(viewport);
    }

    /// Steps run since creation
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }
}
