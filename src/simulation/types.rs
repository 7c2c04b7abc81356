//! Core types for the roundabout simulation
//!
//! These are standalone types that don't depend on any rendering surface.

use std::f32::consts::PI;

/// A unique identifier for a vehicle
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

/// Where a vehicle is in its trip through the roundabout
///
/// The only legal order is `Entering -> Inside -> Leaving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleState {
    /// Driving radially inwards along the source approach lane
    Entering,
    /// Circulating on the ring
    Inside,
    /// Driving radially outwards along the destination lane
    Leaving,
}

/// The two phases of a traffic light. There is no amber phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightColor {
    Green,
    Red,
}

impl LightColor {
    pub fn opposite(self) -> Self {
        match self {
            LightColor::Green => LightColor::Red,
            LightColor::Red => LightColor::Green,
        }
    }
}

impl TryFrom<Rgb> for LightColor {
    type Error = anyhow::Error;

    fn try_from(color: Rgb) -> Result<Self, Self::Error> {
        match color {
            Rgb::GREEN => Ok(LightColor::Green),
            Rgb::RED => Ok(LightColor::Red),
            other => anyhow::bail!(
                "a traffic light can only be red or green, got rgb({}, {}, {})",
                other.r,
                other.g,
                other.b
            ),
        }
    }
}

/// An opaque RGB color as handed over by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Size of the drawing surface in pixels
///
/// Supplied by the renderer; the core never reads a live display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f32 {
        self.width.min(self.height) as f32
    }

    pub fn max_side(&self) -> f32 {
        self.width.max(self.height) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Wall-clock speed multiplier
///
/// Only shortens the interval between ticks; a tick always covers
/// [`TICK_MS`] of simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFactor {
    #[default]
    Normal,
    Fast,
}

impl TimeFactor {
    pub fn value(self) -> u32 {
        match self {
            TimeFactor::Normal => 1,
            TimeFactor::Fast => 10,
        }
    }
}

/// Length of a vehicle in meters
pub const VEHICLE_LENGTH: f32 = 4.6;

/// Width of a vehicle in meters, also the half width of a lane
pub const VEHICLE_WIDTH: f32 = 1.9;

/// Cruising speed of every vehicle in km/h
pub const VEHICLE_SPEED_KMH: f32 = 30.0;

/// Nominal number of ticks per simulated second
pub const TICK_RATE: u32 = 20;

/// Simulated milliseconds covered by one tick
pub const TICK_MS: u32 = 1000 / TICK_RATE;

/// Two angles closer than this (radians) are the same lane slot
pub const ANGLE_TOLERANCE: f32 = 0.01;

/// Fraction of the viewport's smaller side covered by the ring radius
pub const VIEWPORT_FRACTION: f32 = 1.0 / 4.0;

/// Gap (beyond one vehicle length) a stopped vehicle needs before moving off
pub const STOPPED_CLEARANCE: f32 = 5.0;

/// Gap (beyond one vehicle length) a moving vehicle keeps to the one ahead
pub const MOVING_CLEARANCE: f32 = 2.0;

/// Window on the ring, in meters, that must be free before entering
pub const ENTRANCE_CLEARANCE: f32 = 7.0;

/// Distance to the light at which an entering vehicle stops on red
pub const LIGHT_STOP_DISTANCE: f32 = 1.0;

/// Half-angle of the approach gated by the traffic light
pub const LIGHT_GATE_ANGLE: f32 = PI / 16.0;

/// Reference speeds (km/h) for the medium and bad travel-time thresholds
pub const MEDIUM_REFERENCE_SPEED: f32 = 15.0;
pub const BAD_REFERENCE_SPEED: f32 = 8.0;

/// Distance covered in one tick at cruising speed, in meters
pub fn step_distance() -> f32 {
    VEHICLE_SPEED_KMH / TICK_RATE as f32 / 3.6
}

/// Angular position of a lane, `2π × lane / lane_count`
pub fn lane_angle(lane: u32, lane_count: u32) -> f32 {
    if lane_count == 0 {
        return 0.0;
    }
    2.0 * PI * lane as f32 / lane_count as f32
}
