//! The roundabout that ties everything together
//!
//! This is the entry point for running the simulation without any rendering
//! surface. A renderer supplies the viewport size and reads the state back.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::settings::{Settings, SettingsListener};
use super::stats::{format_elapsed_time, BucketCounts, TravelTimeBucket, TravelTimeStats};
use super::stepper::spawn_interval;
use super::traffic_light::TrafficLight;
use super::types::{
    lane_angle, LightColor, TimeFactor, VehicleId, VehicleState, Viewport, ANGLE_TOLERANCE,
    ENTRANCE_CLEARANCE, LIGHT_GATE_ANGLE, LIGHT_STOP_DISTANCE, MOVING_CLEARANCE,
    STOPPED_CLEARANCE, TICK_MS, VEHICLE_LENGTH, VEHICLE_WIDTH, VIEWPORT_FRACTION,
};
use super::vehicle::{RoadConditions, Vehicle, VehicleUpdateResult};

/// Half period of the light before any configuration arrives, in seconds
const INITIAL_HALF_PERIOD: u32 = 1;

/// The light stands this many ring radii east of the center
const LIGHT_DISTANCE_FACTOR: f32 = 1.5;

/// The main simulation: one roundabout, its light and its traffic
pub struct Roundabout {
    lane_count: u32,
    /// Ring radius in meters
    radius: u32,
    /// Light half period in seconds
    half_period: u32,
    /// Vehicles per minute
    car_flow: u32,

    time_factor: TimeFactor,

    /// Simulated milliseconds since the last reset
    simulation_time: u64,

    viewport: Viewport,

    light: TrafficLight,

    /// Live vehicles, oldest first
    vehicles: Vec<Vehicle>,

    stats: TravelTimeStats,

    /// Next ID to assign
    next_id: usize,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl Default for Roundabout {
    fn default() -> Self {
        Self::new()
    }
}

impl Roundabout {
    fn new_internal(rng: Option<StdRng>) -> Self {
        Self {
            lane_count: 0,
            radius: 0,
            half_period: INITIAL_HALF_PERIOD,
            car_flow: 1,
            time_factor: TimeFactor::Normal,
            simulation_time: 0,
            viewport: Viewport::default(),
            light: TrafficLight::new(INITIAL_HALF_PERIOD),
            vehicles: Vec::new(),
            stats: TravelTimeStats::new(),
            next_id: 0,
            rng,
        }
    }

    /// An unconfigured roundabout; nothing happens until [`Roundabout::update`]
    pub fn new() -> Self {
        Self::new_internal(None)
    }

    /// Create a roundabout with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)))
    }

    /// Create and configure a roundabout in one go
    pub fn with_settings(settings: &Settings, viewport: Viewport) -> Self {
        let mut roundabout = Self::new();
        roundabout.set_viewport(viewport);
        roundabout.update(settings);
        roundabout
    }

    fn random_lane(&mut self) -> u32 {
        let lane_count = self.lane_count;
        match &mut self.rng {
            Some(rng) => rng.random_range(0..lane_count),
            None => rand::rng().random_range(0..lane_count),
        }
    }

    fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Pixels per meter, 0 while the geometry is unknown
    fn scale(&self) -> f32 {
        if self.radius == 0 || self.viewport.is_empty() {
            return 0.0;
        }
        VIEWPORT_FRACTION * self.viewport.min_side() / self.radius as f32
    }

    /// Converts meters to pixels, keeping the ring at a quarter of the screen
    pub fn meter_to_pixel(&self, meters: f32) -> f32 {
        meters * self.scale()
    }

    /// Converts pixels to meters, the inverse of [`Roundabout::meter_to_pixel`]
    pub fn pixel_to_meter(&self, pixels: f32) -> f32 {
        let scale = self.scale();
        if scale == 0.0 {
            return 0.0;
        }
        pixels / scale
    }

    /// Distance in meters from the center to the edge of the visible area
    ///
    /// Without a viewport the screen is assumed square, which puts the edge
    /// two ring radii away.
    pub fn visible_radius(&self) -> f32 {
        if self.viewport.is_empty() {
            return 2.0 * self.radius as f32;
        }
        self.pixel_to_meter(self.viewport.max_side() / 2.0)
    }

    /// Apply new settings
    ///
    /// A change of lanes, radius or stop time starts the simulation over.
    /// The car flow is applied in every case.
    pub fn update(&mut self, settings: &Settings) {
        if self.settings().requires_reset(settings) {
            self.lane_count = settings.lanes;
            self.radius = settings.radius;
            self.half_period = settings.stop_time;

            self.reset();

            self.light.set_half_period(self.half_period);
            self.light.set_x(self.radius as f32 * LIGHT_DISTANCE_FACTOR);

            info!(
                "Roundabout reset: {} lanes, {} m radius, light every {} s",
                self.lane_count, self.radius, self.half_period
            );
        }
        self.set_car_flow(settings.car_flow);
    }

    /// The configuration currently applied
    pub fn settings(&self) -> Settings {
        Settings {
            lanes: self.lane_count,
            radius: self.radius,
            stop_time: self.half_period,
            car_flow: self.car_flow,
        }
    }

    /// Remove all vehicles and statistics and restart the clock
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.stats.clear();
        self.simulation_time = 0;
        self.update_times();
    }

    /// Tell the simulation how large the drawing surface is
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.update_times();
        }
    }

    /// Recompute the medium and bad travel-time thresholds
    pub fn update_times(&mut self) {
        let visible = 2.0 * self.visible_radius();
        self.stats.update_thresholds(visible);
    }

    /// Advance the whole simulation by one tick
    /// Returns the number of vehicles that left the simulation
    pub fn calculate(&mut self) -> usize {
        self.simulation_time += u64::from(TICK_MS);
        self.light.advance(TICK_MS / self.time_factor.value());

        for index in 0..self.vehicles.len() {
            let mut vehicle = self.vehicles[index].clone();
            if let VehicleUpdateResult::Transitioned(state) = vehicle.calculate(&*self) {
                debug!("Vehicle {:?} is now {:?}", vehicle.id, state);
            }
            self.vehicles[index] = vehicle;
        }

        self.dispose_vehicles()
    }

    /// Add a vehicle with random source and destination lanes
    ///
    /// It is placed just outside the visible area, further back if the
    /// approach is occupied. Returns `None` before the first configuration.
    pub fn generate_vehicle(&mut self) -> Option<VehicleId> {
        if self.lane_count == 0 {
            warn!("Cannot generate a vehicle before the roundabout is configured");
            return None;
        }

        let source = self.random_lane();
        let destination = self.random_lane();
        let id = self.next_vehicle_id();

        let mut radius = self.visible_radius() + VEHICLE_LENGTH;
        let mut vehicle = Vehicle::new(id, source, destination, self.lane_count, radius);
        while !self.can_place_vehicle(&vehicle) {
            radius += 2.0 * VEHICLE_LENGTH;
            vehicle.set_radius(radius);
        }

        self.vehicles.push(vehicle);
        Some(id)
    }

    /// Insert an already built vehicle as is
    pub fn add_vehicle(&mut self, vehicle: Vehicle) {
        self.next_id = self.next_id.max(vehicle.id.0 + 1);
        self.vehicles.push(vehicle);
    }

    /// Remove vehicles that drove out of the visible area, recording their trip
    /// Returns the number of vehicles removed
    pub fn dispose_vehicles(&mut self) -> usize {
        let limit = 2.0 * self.visible_radius();
        if limit <= 0.0 {
            return 0;
        }
        let stats = &mut self.stats;
        let before = self.vehicles.len();

        self.vehicles.retain(|vehicle| {
            let gone = vehicle.state() == VehicleState::Leaving && vehicle.radius() >= limit;
            if gone {
                let bucket = stats.record(vehicle.life_time());
                debug!(
                    "Vehicle {:?} left after {} ms ({})",
                    vehicle.id,
                    vehicle.life_time(),
                    bucket.as_str()
                );
            }
            !gone
        });

        before - self.vehicles.len()
    }

    /// Can this new vehicle be placed without overlapping an entering one?
    ///
    /// Stricter than only looking at the vehicles ahead: entering vehicles
    /// further out count too, so a newcomer never lands right in front of
    /// one that was pushed back earlier.
    pub fn can_place_vehicle(&self, vehicle: &Vehicle) -> bool {
        !self.vehicles.iter().any(|other| {
            if other.id == vehicle.id
                || other.state() != VehicleState::Entering
                || (other.theta() - vehicle.theta()).abs() > ANGLE_TOLERANCE
            {
                return false;
            }
            let distance = (vehicle.radius() - other.radius()).abs();
            distance - VEHICLE_LENGTH < STOPPED_CLEARANCE
        })
    }

    /// Must this vehicle stop for the one ahead on its lane or for the light?
    pub fn check_lane(&self, vehicle: &Vehicle) -> bool {
        // A stopped vehicle waits for a larger gap than a moving one keeps
        let clearance = if vehicle.is_moving() {
            MOVING_CLEARANCE
        } else {
            STOPPED_CLEARANCE
        };

        for other in &self.vehicles {
            if other.id == vehicle.id || (other.theta() - vehicle.theta()).abs() > ANGLE_TOLERANCE {
                continue;
            }

            let distance = if other.state() == vehicle.state() {
                match vehicle.state() {
                    VehicleState::Entering => vehicle.radius() - other.radius(),
                    VehicleState::Leaving => other.radius() - vehicle.radius(),
                    VehicleState::Inside => other.radius(),
                }
            } else {
                other.radius()
            };

            if distance > 0.0 && distance - VEHICLE_LENGTH < clearance {
                return true;
            }
        }

        self.must_stop_at_light(vehicle)
    }

    /// An entering vehicle on the gated approach stops right before a red light
    fn must_stop_at_light(&self, vehicle: &Vehicle) -> bool {
        if self.light.color() != LightColor::Red
            || vehicle.state() != VehicleState::Entering
            || vehicle.theta().cos() < LIGHT_GATE_ANGLE.cos()
        {
            return false;
        }

        let distance = vehicle.radius() - VEHICLE_LENGTH / 2.0 - self.light.x();
        (0.0..=LIGHT_STOP_DISTANCE).contains(&distance)
    }

    /// Must this entering vehicle yield to traffic on the ring?
    pub fn check_entrance(&self, vehicle: &Vehicle) -> bool {
        let ring_radius = self.radius as f32;
        let in_window =
            |distance: f32| distance - VEHICLE_LENGTH <= ENTRANCE_CLEARANCE && distance + VEHICLE_LENGTH >= 0.0;

        self.vehicles
            .iter()
            .filter(|other| other.state() == VehicleState::Inside)
            .any(|other| {
                let delta = other.theta() - vehicle.theta();
                let direct = ring_radius * delta;
                let wrapped = ring_radius * (delta + 2.0 * std::f32::consts::PI).abs();
                in_window(direct) || in_window(wrapped)
            })
    }

    /// Exits are never blocked
    pub fn check_exit(&self, _vehicle: &Vehicle) -> bool {
        false
    }

    /// The ring itself never blocks
    pub fn check_inside_roundabout(&self, _theta: f32) -> bool {
        false
    }

    /// Change the speed multiplier; the light restarts its phase
    pub fn set_time_factor(&mut self, time_factor: TimeFactor) {
        self.time_factor = time_factor;
        self.light.set_time_factor(time_factor);
    }

    /// Ignored unless positive
    pub fn set_car_flow(&mut self, car_flow: u32) {
        if car_flow > 0 {
            self.car_flow = car_flow;
        }
    }

    /// Ticks between two generated vehicles at the current car flow
    pub fn spawn_interval(&self) -> u32 {
        spawn_interval(self.car_flow)
    }

    pub fn lane_count(&self) -> u32 {
        self.lane_count
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn stop_time(&self) -> u32 {
        self.half_period
    }

    pub fn car_flow(&self) -> u32 {
        self.car_flow
    }

    pub fn time_factor(&self) -> TimeFactor {
        self.time_factor
    }

    pub fn simulation_time(&self) -> u64 {
        self.simulation_time
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn light(&self) -> &TrafficLight {
        &self.light
    }

    /// Direct access to the light, e.g. to force its color
    pub fn light_mut(&mut self) -> &mut TrafficLight {
        &mut self.light
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn stats(&self) -> &TravelTimeStats {
        &self.stats
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn vehicle_count_inside(&self) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.state() == VehicleState::Inside)
            .count()
    }

    /// Vehicles generated since the last reset, finished or not
    pub fn vehicles_generated(&self) -> usize {
        self.stats.completed() + self.vehicles.len()
    }

    pub fn circulation_statistics(&self) -> BucketCounts {
        self.stats.counts()
    }

    /// Mean trip duration in whole seconds
    pub fn average_vehicle_life_time(&self) -> u64 {
        self.stats.average_life_time()
    }

    pub fn medium_time(&self) -> u32 {
        self.stats.medium_time()
    }

    pub fn bad_time(&self) -> u32 {
        self.stats.bad_time()
    }

    /// Copy out everything a renderer needs for one frame
    pub fn view(&self) -> RoundaboutView {
        RoundaboutView {
            lane_count: self.lane_count,
            radius: self.radius,
            vehicles: self
                .vehicles
                .iter()
                .map(|v| VehicleView {
                    id: v.id,
                    state: v.state(),
                    theta: v.theta(),
                    radius: v.radius(),
                    position: v.position(),
                })
                .collect(),
            light_color: self.light.color(),
            light_position: (self.light.x(), self.light.y()),
            counts: self.stats.counts(),
            average_life_time: self.stats.average_life_time(),
            medium_time: self.stats.medium_time(),
            bad_time: self.stats.bad_time(),
            quality: self.stats.quality(),
            simulation_time: self.simulation_time,
            vehicles_inside: self.vehicle_count_inside(),
            vehicles_generated: self.vehicles_generated(),
        }
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        let counts = self.stats.counts();
        format!(
            "Time: {} | Vehicles: {} ({} inside) | Generated: {} | Completed: {} (good {}, medium {}, bad {}) | Average: {} s | Light: {:?}",
            format_elapsed_time(self.simulation_time),
            self.vehicles.len(),
            self.vehicle_count_inside(),
            self.vehicles_generated(),
            counts.total(),
            counts.good,
            counts.medium,
            counts.bad,
            self.stats.average_life_time(),
            self.light.color()
        )
    }

    pub fn print_summary(&self) {
        println!("=== Roundabout Summary ===");
        println!(
            "Lanes: {}, radius: {} m, stop time: {} s, car flow: {}/min",
            self.lane_count, self.radius, self.half_period, self.car_flow
        );
        println!("{}", self.summary());
        println!(
            "Thresholds: medium {} s, bad {} s | Traffic: {}",
            self.stats.medium_time(),
            self.stats.bad_time(),
            self.stats.quality().as_str()
        );
    }

    /// Draw the roundabout as text, `rows` lines high
    ///
    /// Legend: `.` road, `o` ring, `E`/`I`/`L` entering, inside and leaving
    /// vehicles, `R`/`G` the traffic light.
    pub fn render_map(&self, rows: usize) -> String {
        let rows = rows.max(3) | 1;
        let cols = 2 * rows + 1;
        let extent = self.visible_radius();
        if extent <= 0.0 {
            return String::new();
        }

        let mut grid = vec![vec![' '; cols]; rows];
        let half_rows = (rows / 2) as f32;
        let half_cols = (cols / 2) as f32;
        let meters_per_row = extent / half_rows;
        // Terminal cells are about twice as high as they are wide
        let meters_per_col = meters_per_row / 2.0;

        let to_grid = |x: f32, y: f32| -> Option<(usize, usize)> {
            let col = (half_cols + x / meters_per_col).round();
            let row = (half_rows - y / meters_per_row).round();
            if col < 0.0 || row < 0.0 || col >= cols as f32 || row >= rows as f32 {
                return None;
            }
            Some((row as usize, col as usize))
        };

        let ring_radius = self.radius as f32;

        // Approach roads
        for lane in 0..self.lane_count {
            let angle = lane_angle(lane, self.lane_count);
            let (sin, cos) = angle.sin_cos();
            let mut r = ring_radius;
            while r <= extent * std::f32::consts::SQRT_2 {
                if let Some((row, col)) = to_grid(r * cos, r * sin) {
                    grid[row][col] = '.';
                }
                r += meters_per_col / 2.0;
            }
        }

        // Ring
        let lane_center = ring_radius - VEHICLE_WIDTH;
        let steps = (cols * 4).max(64);
        for step in 0..steps {
            let angle = 2.0 * std::f32::consts::PI * step as f32 / steps as f32;
            if let Some((row, col)) = to_grid(lane_center * angle.cos(), lane_center * angle.sin()) {
                grid[row][col] = 'o';
            }
        }

        if let Some((row, col)) = to_grid(self.light.x(), self.light.y()) {
            grid[row][col] = match self.light.color() {
                LightColor::Red => 'R',
                LightColor::Green => 'G',
            };
        }

        for vehicle in &self.vehicles {
            let (x, y) = vehicle.position();
            if let Some((row, col)) = to_grid(x, y) {
                grid[row][col] = match vehicle.state() {
                    VehicleState::Entering => 'E',
                    VehicleState::Inside => 'I',
                    VehicleState::Leaving => 'L',
                };
            }
        }

        grid.iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Draw a visual map of the roundabout in the terminal
    pub fn draw_map(&self) {
        println!("\n=== Roundabout Map ===");
        println!("Legend: .=Road, o=Ring, E/I/L=Entering/Inside/Leaving, R/G=Light");
        println!();
        println!("{}", self.render_map(25));
        println!();
    }
}

impl RoadConditions for Roundabout {
    fn ring_radius(&self) -> f32 {
        self.radius as f32
    }

    fn lane_count(&self) -> u32 {
        self.lane_count
    }

    fn check_entrance(&self, vehicle: &Vehicle) -> bool {
        Roundabout::check_entrance(self, vehicle)
    }

    fn check_lane(&self, vehicle: &Vehicle) -> bool {
        Roundabout::check_lane(self, vehicle)
    }

    fn check_exit(&self, vehicle: &Vehicle) -> bool {
        Roundabout::check_exit(self, vehicle)
    }

    fn check_inside_roundabout(&self, theta: f32) -> bool {
        Roundabout::check_inside_roundabout(self, theta)
    }
}

impl SettingsListener for Roundabout {
    fn on_settings_changed(&mut self, settings: &Settings) {
        self.update(settings);
    }
}

/// A vehicle as seen by a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub state: VehicleState,
    pub theta: f32,
    pub radius: f32,
    /// Meters from the center, lane offset included
    pub position: (f32, f32),
}

/// Read-only snapshot of the roundabout for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RoundaboutView {
    pub lane_count: u32,
    pub radius: u32,
    pub vehicles: Vec<VehicleView>,
    pub light_color: LightColor,
    pub light_position: (f32, f32),
    pub counts: BucketCounts,
    pub average_life_time: u64,
    pub medium_time: u32,
    pub bad_time: u32,
    pub quality: TravelTimeBucket,
    pub simulation_time: u64,
    pub vehicles_inside: usize,
    pub vehicles_generated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::Rgb;

    fn configured() -> Roundabout {
        let mut roundabout = Roundabout::new_with_seed(7);
        roundabout.set_viewport(Viewport::new(800, 600));
        roundabout.update(&Settings::new(4, 15, 10, 20));
        roundabout
    }

    #[test]
    fn unconfigured_roundabout_answers_with_zeroes() {
        let mut roundabout = Roundabout::new();
        assert_eq!(roundabout.vehicle_count(), 0);
        assert_eq!(roundabout.average_vehicle_life_time(), 0);
        assert_eq!(roundabout.meter_to_pixel(10.0), 0.0);
        assert_eq!(roundabout.pixel_to_meter(10.0), 0.0);
        assert_eq!(roundabout.generate_vehicle(), None);
        assert_eq!(roundabout.calculate(), 0);
        assert_eq!(roundabout.view().vehicles.len(), 0);
    }

    #[test]
    fn meters_and_pixels_round_trip() {
        let roundabout = configured();
        // A quarter of 600 px for 15 m
        assert!((roundabout.meter_to_pixel(15.0) - 150.0).abs() < 1e-4);

        for meters in [0.5_f32, 4.6, 15.0, 123.25] {
            let back = roundabout.pixel_to_meter(roundabout.meter_to_pixel(meters));
            assert!((back - meters).abs() < 1e-4 * meters.max(1.0));
        }
    }

    #[test]
    fn update_applies_geometry_and_places_the_light() {
        let roundabout = configured();
        assert_eq!(roundabout.lane_count(), 4);
        assert_eq!(roundabout.radius(), 15);
        assert_eq!(roundabout.stop_time(), 10);
        assert_eq!(roundabout.car_flow(), 20);
        assert_eq!(roundabout.light().x(), 22.5);
        assert!(roundabout.light().is_running());
        assert_eq!(roundabout.light().green_time(), 10);
        assert_eq!(roundabout.settings(), Settings::new(4, 15, 10, 20));
    }

    #[test]
    fn lane_or_stop_time_change_resets() {
        let mut roundabout = configured();
        roundabout.generate_vehicle();
        for _ in 0..10 {
            roundabout.calculate();
        }

        roundabout.update(&Settings::new(6, 15, 10, 20));
        assert_eq!(roundabout.lane_count(), 6);
        assert_eq!(roundabout.vehicle_count(), 0);
        assert_eq!(roundabout.simulation_time(), 0);

        roundabout.generate_vehicle();
        for _ in 0..10 {
            roundabout.calculate();
        }

        roundabout.update(&Settings::new(6, 15, 20, 20));
        assert_eq!(roundabout.vehicle_count(), 0);
        assert_eq!(roundabout.simulation_time(), 0);
        assert_eq!(roundabout.light().green_time(), 20);
        assert_eq!(roundabout.light().remaining(), Some(20_000));
    }

    #[test]
    fn moving_vehicle_keeps_going_where_a_stopped_one_waits() {
        let mut roundabout = configured();
        let leader = 30.0;
        roundabout.add_vehicle(Vehicle::new(VehicleId(0), 1, 2, 4, leader));

        // A 6 m gap is enough to move off
        let mut follower = Vehicle::new(VehicleId(1), 1, 2, 4, leader + VEHICLE_LENGTH + 6.0);
        follower.check_road(&roundabout);
        assert!(follower.is_moving());

        // At 3 m a moving vehicle carries on, a stopped one stays put
        follower.set_radius(leader + VEHICLE_LENGTH + 3.0);
        assert!(!roundabout.check_lane(&follower));
        let stopped = Vehicle::new(VehicleId(2), 1, 2, 4, leader + VEHICLE_LENGTH + 3.0);
        assert!(roundabout.check_lane(&stopped));

        // Under 2 m even a moving vehicle stops
        follower.set_radius(leader + VEHICLE_LENGTH + 1.0);
        assert!(roundabout.check_lane(&follower));
    }

    #[test]
    fn entrance_check_sees_ring_traffic_across_zero() {
        let mut roundabout = configured();
        roundabout.update(&Settings::new(24, 15, 10, 20));

        // Enter from lane 0; the ring turns clockwise so theta goes below zero
        roundabout.add_vehicle(Vehicle::new(VehicleId(0), 0, 12, 24, 13.0));
        roundabout.calculate();
        let inside = &roundabout.vehicles()[0];
        assert_eq!(inside.state(), VehicleState::Inside);
        assert!(inside.theta() < 0.0);

        // Lane 23 sits just under 2π, a few meters ahead of the ring vehicle
        let upstream = Vehicle::new(VehicleId(1), 23, 5, 24, 17.5);
        assert!(roundabout.check_entrance(&upstream));

        // Lane 2 was passed more than a vehicle length ago
        let passed = Vehicle::new(VehicleId(2), 2, 5, 24, 17.5);
        assert!(!roundabout.check_entrance(&passed));
    }

    #[test]
    fn car_flow_change_keeps_the_simulation() {
        let mut roundabout = configured();
        roundabout.generate_vehicle();
        for _ in 0..10 {
            roundabout.calculate();
        }

        roundabout.update(&Settings::new(4, 15, 10, 60));
        assert_eq!(roundabout.car_flow(), 60);
        assert_eq!(roundabout.vehicle_count(), 1);
        assert_eq!(roundabout.simulation_time(), 500);

        roundabout.update(&Settings::new(4, 25, 10, 60));
        assert_eq!(roundabout.vehicle_count(), 0);
        assert_eq!(roundabout.simulation_time(), 0);
    }

    #[test]
    fn repeated_identical_update_is_idempotent() {
        let mut roundabout = configured();
        roundabout.generate_vehicle();
        roundabout.calculate();
        let before = roundabout.view();

        roundabout.update(&Settings::new(4, 15, 10, 20));
        assert_eq!(roundabout.view(), before);
    }

    #[test]
    fn generated_vehicle_starts_outside_the_view() {
        let mut roundabout = configured();
        let id = roundabout.generate_vehicle().unwrap();
        let vehicle = &roundabout.vehicles()[0];

        assert_eq!(vehicle.id, id);
        assert_eq!(vehicle.state(), VehicleState::Entering);
        // 400 px at 10 px/m is 40 m, plus one vehicle length
        assert!((vehicle.radius() - 44.6).abs() < 1e-4);
        assert!(vehicle.source() < 4 && vehicle.destination() < 4);
    }

    #[test]
    fn crowded_approach_pushes_new_vehicles_back() {
        let mut roundabout = configured();
        let spawn = roundabout.visible_radius() + VEHICLE_LENGTH;
        for id in 0..3 {
            roundabout.add_vehicle(Vehicle::new(VehicleId(id), 0, 1, 4, spawn));
        }
        // The newcomer needs a full stopping gap behind the queue
        let mut probe = Vehicle::new(VehicleId(10), 0, 1, 4, spawn);
        assert!(!roundabout.can_place_vehicle(&probe));
        probe.set_radius(spawn + 2.0 * VEHICLE_LENGTH);
        assert!(!roundabout.can_place_vehicle(&probe));
        probe.set_radius(spawn + 4.0 * VEHICLE_LENGTH);
        assert!(roundabout.can_place_vehicle(&probe));
    }

    #[test]
    fn close_follower_on_same_approach_must_stop() {
        let mut roundabout = configured();
        let leader = Vehicle::new(VehicleId(0), 1, 2, 4, 30.0);
        let follower = Vehicle::new(VehicleId(1), 1, 2, 4, 33.0);
        roundabout.add_vehicle(leader.clone());
        roundabout.add_vehicle(follower.clone());

        assert!(roundabout.check_lane(&follower));
        // The leader has nobody ahead
        assert!(!roundabout.check_lane(&leader));
    }

    #[test]
    fn distant_vehicles_on_other_lanes_do_not_block() {
        let mut roundabout = configured();
        let other_lane = Vehicle::new(VehicleId(0), 2, 3, 4, 30.0);
        let far_ahead = Vehicle::new(VehicleId(1), 1, 3, 4, 20.0);
        let vehicle = Vehicle::new(VehicleId(2), 1, 2, 4, 33.0);
        roundabout.add_vehicle(other_lane);
        roundabout.add_vehicle(far_ahead);

        // 13 m to the vehicle ahead is enough even from a standstill
        assert!(!roundabout.check_lane(&vehicle));
    }

    #[test]
    fn red_light_stops_entering_vehicle_on_the_gated_approach() {
        let mut roundabout = configured();
        roundabout.light_mut().set_color(Rgb::RED).unwrap();

        // Light at 22.5 m: stop when the front is within a meter of it
        let at_light = Vehicle::new(VehicleId(0), 0, 2, 4, 22.5 + VEHICLE_LENGTH / 2.0 + 0.5);
        assert!(roundabout.check_lane(&at_light));

        let far = Vehicle::new(VehicleId(1), 0, 2, 4, 30.0);
        assert!(!roundabout.check_lane(&far));

        let other_approach = Vehicle::new(VehicleId(2), 1, 2, 4, 22.5 + VEHICLE_LENGTH / 2.0 + 0.5);
        assert!(!roundabout.check_lane(&other_approach));

        roundabout.light_mut().set_color(Rgb::GREEN).unwrap();
        assert!(!roundabout.check_lane(&at_light));
    }

    #[test]
    fn entering_vehicle_yields_to_ring_traffic() {
        let mut roundabout = configured();
        // Drive one vehicle onto the ring from lane 1
        roundabout.add_vehicle(Vehicle::new(VehicleId(0), 1, 0, 4, 13.0));
        roundabout.calculate();
        assert_eq!(roundabout.vehicles()[0].state(), VehicleState::Inside);

        // Right at lane 1 the ring is occupied
        let waiting = Vehicle::new(VehicleId(1), 1, 3, 4, 17.5);
        assert!(roundabout.check_entrance(&waiting));

        // Lane 3 is half a lap away
        let clear = Vehicle::new(VehicleId(2), 3, 0, 4, 17.5);
        assert!(!roundabout.check_entrance(&clear));
    }

    #[test]
    fn exit_and_ring_checks_never_block() {
        let roundabout = configured();
        let vehicle = Vehicle::new(VehicleId(0), 0, 1, 4, 13.0);
        assert!(!roundabout.check_exit(&vehicle));
        assert!(!roundabout.check_inside_roundabout(0.0));
    }

    #[test]
    fn vehicles_finish_and_land_in_buckets() {
        let mut roundabout = configured();
        roundabout.add_vehicle(Vehicle::new(VehicleId(0), 1, 2, 4, 44.6));

        let mut disposed = 0;
        let mut last_state = VehicleState::Entering;
        for _ in 0..2000 {
            if let Some(vehicle) = roundabout.vehicles().first() {
                assert!(vehicle.state() >= last_state);
                last_state = vehicle.state();
            }
            disposed += roundabout.calculate();
            if disposed > 0 {
                break;
            }
        }

        assert_eq!(disposed, 1);
        assert_eq!(last_state, VehicleState::Leaving);
        assert_eq!(roundabout.vehicle_count(), 0);
        assert_eq!(roundabout.circulation_statistics().total(), 1);
        assert!(roundabout.average_vehicle_life_time() > 0);
        assert_eq!(roundabout.vehicles_generated(), 1);
    }

    #[test]
    fn viewport_change_recomputes_thresholds() {
        let mut roundabout = configured();
        let medium = roundabout.medium_time();
        roundabout.set_viewport(Viewport::new(1600, 600));
        assert!(roundabout.medium_time() > medium);
        assert!(roundabout.bad_time() > roundabout.medium_time());
    }

    #[test]
    fn fast_light_toggles_after_the_same_number_of_ticks() {
        let mut roundabout = configured();
        roundabout.update(&Settings::new(4, 15, 1, 20));
        assert_eq!(roundabout.light().delay_needed(), 1000);

        roundabout.set_time_factor(TimeFactor::Fast);
        assert_eq!(roundabout.light().delay_needed(), 100);

        // Ticks come ten times as often, each one worth a tenth of the timer

        for _ in 0..19 {
            roundabout.calculate();
        }
        assert_eq!(roundabout.light().color(), LightColor::Green);
        roundabout.calculate();
        assert_eq!(roundabout.light().color(), LightColor::Red);
    }

    #[test]
    fn map_shows_ring_light_and_vehicles() {
        let mut roundabout = configured();
        roundabout.add_vehicle(Vehicle::new(VehicleId(0), 1, 2, 4, 20.0));
        let map = roundabout.render_map(25);

        assert_eq!(map.split('\n').count(), 25);
        assert!(map.contains('o'));
        assert!(map.contains('G'));
        assert!(map.contains('E'));
    }
}
