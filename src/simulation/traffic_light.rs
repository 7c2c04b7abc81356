//! Traffic light gating the east approach of the roundabout
//!
//! Standalone implementation driven by the simulation tick instead of a
//! wall-clock timer, so it behaves the same headless and on screen.

use anyhow::Result;
use log::debug;

use super::types::{LightColor, Rgb, TimeFactor};

/// A two-phase timed gate
#[derive(Debug, Clone)]
pub struct TrafficLight {
    color: LightColor,
    /// Length of the green phase in seconds
    green_time: u32,
    /// Length of the red phase in seconds
    red_time: u32,
    /// Position in meters relative to the roundabout center
    x: f32,
    y: f32,
    time_factor: TimeFactor,
    /// Milliseconds left before the next toggle, `None` while stopped
    timer: Option<u32>,
}

impl TrafficLight {
    /// Create a light toggling every `half_period` seconds
    ///
    /// The light starts green and idle; call [`TrafficLight::start`] or
    /// [`TrafficLight::set_half_period`] to begin toggling.
    pub fn new(half_period: u32) -> Self {
        Self::with_phases(half_period, half_period)
    }

    pub fn with_phases(green_time: u32, red_time: u32) -> Self {
        Self {
            color: LightColor::Green,
            green_time,
            red_time,
            x: 0.0,
            y: 0.0,
            time_factor: TimeFactor::Normal,
            timer: None,
        }
    }

    /// Timer delay in milliseconds for the current phase
    pub fn delay_needed(&self) -> u32 {
        let phase = match self.color {
            LightColor::Red => self.red_time,
            LightColor::Green => self.green_time,
        };
        phase.saturating_mul(1000) / self.time_factor.value()
    }

    /// Arm the timer for the current phase
    ///
    /// A phase that resolves to no delay at all freezes the light on green.
    pub fn start(&mut self) {
        let delay = self.delay_needed();
        if delay > 0 {
            self.timer = Some(delay);
        } else {
            self.freeze_on_green();
        }
    }

    pub fn stop(&mut self) {
        self.timer = None;
    }

    /// Restart the current phase from the beginning
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    /// Stop toggling and stay green
    pub fn freeze_on_green(&mut self) {
        self.timer = None;
        self.color = LightColor::Green;
    }

    /// Switch to the other color and arm the timer for the new phase
    pub fn toggle(&mut self) {
        self.color = self.color.opposite();
        debug!("Traffic light turned {:?}", self.color);
        self.start();
    }

    /// Let `elapsed_ms` of timer time pass
    /// Returns true if the light toggled
    pub fn advance(&mut self, elapsed_ms: u32) -> bool {
        let Some(remaining) = self.timer else {
            return false;
        };

        if elapsed_ms >= remaining {
            self.toggle();
            true
        } else {
            self.timer = Some(remaining - elapsed_ms);
            false
        }
    }

    /// Override the current color. Only pure red or green are accepted.
    pub fn set_color(&mut self, color: Rgb) -> Result<()> {
        self.color = LightColor::try_from(color)?;
        Ok(())
    }

    /// Set both phases to `half_period` seconds and restart the timer
    ///
    /// Time already spent in the current phase is discarded.
    pub fn set_half_period(&mut self, half_period: u32) {
        self.set_green_time(half_period);
        self.set_red_time(half_period);
        self.restart();
    }

    /// Also restarts the timer
    pub fn set_green_time(&mut self, green_time: u32) {
        self.green_time = green_time;
        self.restart();
    }

    /// Also restarts the timer
    pub fn set_red_time(&mut self, red_time: u32) {
        self.red_time = red_time;
        self.restart();
    }

    /// Change the speed multiplier and restart the current phase with it
    pub fn set_time_factor(&mut self, time_factor: TimeFactor) {
        self.time_factor = time_factor;
        self.restart();
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    pub fn color(&self) -> LightColor {
        self.color
    }

    pub fn green_time(&self) -> u32 {
        self.green_time
    }

    pub fn red_time(&self) -> u32 {
        self.red_time
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Milliseconds until the next toggle, if the light is running
    pub fn remaining(&self) -> Option<u32> {
        self.timer
    }
}
