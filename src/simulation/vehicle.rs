//! Vehicle movement logic for the roundabout simulation
//!
//! A vehicle keeps no collision state of its own: every tick it asks the
//! road (normally the [`Roundabout`](super::Roundabout)) whether it may move.

use std::f32::consts::PI;

use super::types::{
    lane_angle, step_distance, VehicleId, VehicleState, TICK_MS, VEHICLE_LENGTH, VEHICLE_WIDTH,
};

/// Queries a vehicle makes about its surroundings before moving
///
/// Every `check_*` method returns true when the vehicle must stop.
pub trait RoadConditions {
    /// Ring radius in meters
    fn ring_radius(&self) -> f32;

    fn lane_count(&self) -> u32;

    /// Is the ring occupied in front of this entering vehicle?
    fn check_entrance(&self, vehicle: &Vehicle) -> bool;

    /// Is the approach or exit lane blocked ahead of this vehicle?
    fn check_lane(&self, vehicle: &Vehicle) -> bool;

    /// Is the exit closed to this vehicle?
    fn check_exit(&self, vehicle: &Vehicle) -> bool;

    /// Is the ring blocked at this angle?
    fn check_inside_roundabout(&self, theta: f32) -> bool;
}

/// Result of a vehicle update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    /// The road was not clear, the vehicle stayed put
    Waiting,
    /// The vehicle moved without changing state
    Moved,
    /// The vehicle moved and entered a new state
    Transitioned(VehicleState),
}

/// A vehicle driving through the roundabout
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    state: VehicleState,
    /// Angular position in radians
    theta: f32,
    /// Distance from the roundabout center in meters
    radius: f32,
    source: u32,
    destination: u32,
    is_moving: bool,
    /// Simulated milliseconds since creation
    life_time: u64,
}

impl Vehicle {
    /// Create a vehicle on the `source` approach at `radius` meters
    pub fn new(id: VehicleId, source: u32, destination: u32, lane_count: u32, radius: f32) -> Self {
        Self {
            id,
            state: VehicleState::Entering,
            theta: lane_angle(source, lane_count),
            radius,
            source,
            destination,
            is_moving: false,
            life_time: 0,
        }
    }

    /// Advance the vehicle by one tick
    pub fn calculate(&mut self, road: &impl RoadConditions) -> VehicleUpdateResult {
        self.check_road(road);

        let result = if self.is_moving {
            self.move_vehicle(road)
        } else {
            VehicleUpdateResult::Waiting
        };

        self.life_time += u64::from(TICK_MS);
        result
    }

    /// Decide whether the vehicle may move this tick
    pub fn check_road(&mut self, road: &impl RoadConditions) {
        match self.state {
            VehicleState::Entering | VehicleState::Leaving => {
                // Entering vehicles first yield to the ring, then follow the
                // same lane rules as leaving ones
                if self.state == VehicleState::Entering
                    && self.in_entrance_zone(road.ring_radius())
                    && road.check_entrance(self)
                {
                    self.is_moving = false;
                    return;
                }
                self.is_moving = !road.check_lane(self);
            }
            VehicleState::Inside => {
                let blocked = (self.is_at_exit(road.ring_radius(), road.lane_count())
                    && road.check_exit(self))
                    || road.check_inside_roundabout(self.theta);
                self.is_moving = !blocked;
            }
        }
    }

    /// Move one step along the current path
    pub fn move_vehicle(&mut self, road: &impl RoadConditions) -> VehicleUpdateResult {
        let ring_radius = road.ring_radius();
        let lane_count = road.lane_count();
        let previous_state = self.state;

        match self.state {
            VehicleState::Entering => {
                if self.radius <= ring_radius - VEHICLE_WIDTH {
                    self.state = VehicleState::Inside;
                }
                self.radius -= step_distance();
            }
            VehicleState::Leaving => {
                self.radius += step_distance();
            }
            VehicleState::Inside => {
                if self.is_at_exit(ring_radius, lane_count) {
                    self.state = VehicleState::Leaving;
                }
            }
        }

        self.update_theta(ring_radius, lane_count);

        if self.state != previous_state {
            VehicleUpdateResult::Transitioned(self.state)
        } else {
            VehicleUpdateResult::Moved
        }
    }

    /// Snap theta to the lane while on an approach, or turn along the ring
    fn update_theta(&mut self, ring_radius: f32, lane_count: u32) {
        match self.state {
            VehicleState::Entering => self.theta = lane_angle(self.source, lane_count),
            VehicleState::Leaving => self.theta = lane_angle(self.destination, lane_count),
            VehicleState::Inside => {
                self.radius = ring_radius - VEHICLE_WIDTH;
                self.theta -= step_distance() / self.radius;
            }
        }
    }

    /// Has the vehicle reached the angle of its destination lane?
    ///
    /// Theta only decreases on the ring, so a vehicle whose destination is not
    /// below its source has to go past zero first. The exit triggers one
    /// vehicle length early.
    pub fn is_at_exit(&self, ring_radius: f32, lane_count: u32) -> bool {
        if ring_radius <= 0.0 {
            return false;
        }

        let margin = VEHICLE_LENGTH / ring_radius;
        let exit_angle = lane_angle(self.destination, lane_count);
        let diff = if self.source <= self.destination {
            self.theta - margin + 2.0 * PI - exit_angle
        } else {
            self.theta - margin - exit_angle
        };

        diff <= 0.0
    }

    /// Stretch of the approach just outside the ring where entering vehicles yield
    fn in_entrance_zone(&self, ring_radius: f32) -> bool {
        self.radius <= ring_radius + 2.0 * VEHICLE_WIDTH && self.radius >= ring_radius + VEHICLE_WIDTH
    }

    /// Sideways offset from the lane axis in meters (drive on the right)
    pub fn lane_offset(&self) -> f32 {
        match self.state {
            VehicleState::Entering => -VEHICLE_WIDTH,
            VehicleState::Leaving => VEHICLE_WIDTH,
            VehicleState::Inside => 0.0,
        }
    }

    /// Cartesian position in meters relative to the roundabout center
    pub fn position(&self) -> (f32, f32) {
        let (sin, cos) = self.theta.sin_cos();
        let offset = self.lane_offset();
        (
            self.radius * cos - offset * sin,
            self.radius * sin + offset * cos,
        )
    }

    pub(crate) fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn source(&self) -> u32 {
        self.source
    }

    pub fn destination(&self) -> u32 {
        self.destination
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn life_time(&self) -> u64 {
        self.life_time
    }
}
