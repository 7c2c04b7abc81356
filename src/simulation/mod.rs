//! Standalone roundabout simulation module
//!
//! This module contains all the core simulation logic. It never draws
//! anything; a renderer reads the state back through
//! [`Roundabout::view`] and supplies the viewport size.

mod roundabout;
mod settings;
mod stats;
mod stepper;
mod traffic_light;
mod types;
mod vehicle;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use roundabout::{Roundabout, RoundaboutView, VehicleView};
#[allow(unused_imports)]
pub use settings::{
    Settings, SettingsListener, SettingsPoller, SettingsWatcher, DEFAULT_CAR_FLOW, DEFAULT_LANES,
    DEFAULT_RADIUS, DEFAULT_STOP_TIME, MAX_CAR_FLOW, MAX_LANES, MAX_RADIUS, MAX_STOP_TIME,
    MIN_CAR_FLOW, MIN_LANES, MIN_RADIUS, MIN_STOP_TIME, REFRESH_DELAY,
};
#[allow(unused_imports)]
pub use stats::{
    format_duration, format_elapsed_time, BucketCounts, BucketShares, TravelTimeBucket,
    TravelTimeStats,
};
#[allow(unused_imports)]
pub use stepper::{spawn_interval, StepOutcome, Stepper};
#[allow(unused_imports)]
pub use traffic_light::TrafficLight;
#[allow(unused_imports)]
pub use types::{
    lane_angle, step_distance, LightColor, Rgb, TimeFactor, VehicleId, VehicleState, Viewport,
    TICK_MS, TICK_RATE, VEHICLE_LENGTH, VEHICLE_WIDTH,
};
#[allow(unused_imports)]
pub use vehicle::{RoadConditions, Vehicle, VehicleUpdateResult};
