//! User settings for the roundabout and the channel that delivers them
//!
//! Settings are validated here, not by the simulation. A poller thread reads
//! the current settings at a fixed interval and forwards only the snapshots
//! that differ from the previous one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;

/// Interval between two reads of the settings source
pub const REFRESH_DELAY: Duration = Duration::from_millis(100);

pub const MIN_LANES: u32 = 2;
pub const DEFAULT_LANES: u32 = 4;
pub const MAX_LANES: u32 = 24;

pub const MIN_RADIUS: u32 = 10;
pub const DEFAULT_RADIUS: u32 = 15;
pub const MAX_RADIUS: u32 = 100;

pub const MIN_STOP_TIME: u32 = 0;
pub const DEFAULT_STOP_TIME: u32 = 10;
pub const MAX_STOP_TIME: u32 = 200;

pub const MIN_CAR_FLOW: u32 = 1;
pub const DEFAULT_CAR_FLOW: u32 = 20;
pub const MAX_CAR_FLOW: u32 = 200;

/// A validated configuration snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Number of approach lanes
    pub lanes: u32,
    /// Ring radius in meters
    pub radius: u32,
    /// Traffic light half period in seconds, 0 disables the light
    pub stop_time: u32,
    /// Vehicles generated per minute of simulated time
    pub car_flow: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
            radius: DEFAULT_RADIUS,
            stop_time: DEFAULT_STOP_TIME,
            car_flow: DEFAULT_CAR_FLOW,
        }
    }
}

/// Settings as typed by a user, possibly out of range or missing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    lanes: Option<i64>,
    radius: Option<i64>,
    stop_time: Option<i64>,
    car_flow: Option<i64>,
}

fn clamp(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

impl Settings {
    /// Build settings from raw values, clamping each one into its range
    pub fn new(lanes: i64, radius: i64, stop_time: i64, car_flow: i64) -> Self {
        Self {
            lanes: clamp(lanes, MIN_LANES, MAX_LANES),
            radius: clamp(radius, MIN_RADIUS, MAX_RADIUS),
            stop_time: clamp(stop_time, MIN_STOP_TIME, MAX_STOP_TIME),
            car_flow: clamp(car_flow, MIN_CAR_FLOW, MAX_CAR_FLOW),
        }
    }

    /// Parse settings from JSON; missing fields take their default value
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: SettingsFile = serde_json::from_str(json).context("Invalid settings JSON")?;
        let defaults = Self::default();
        Ok(Self::new(
            file.lanes.unwrap_or(i64::from(defaults.lanes)),
            file.radius.unwrap_or(i64::from(defaults.radius)),
            file.stop_time.unwrap_or(i64::from(defaults.stop_time)),
            file.car_flow.unwrap_or(i64::from(defaults.car_flow)),
        ))
    }

    /// Read settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("In {}", path.display()))
    }

    /// Whether switching to `other` requires the simulation to start over
    ///
    /// Only the car flow can change on the fly.
    pub fn requires_reset(&self, other: &Settings) -> bool {
        self.lanes != other.lanes || self.radius != other.radius || self.stop_time != other.stop_time
    }
}

/// Something that reacts to new settings
pub trait SettingsListener {
    /// Must be idempotent: applying the same settings twice changes nothing
    fn on_settings_changed(&mut self, settings: &Settings);
}

/// Remembers the last snapshot and reports only the ones that differ
#[derive(Debug, Default)]
pub struct SettingsWatcher {
    last: Option<Settings>,
}

impl SettingsWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot if it differs from the previous one
    pub fn observe(&mut self, current: Settings) -> Option<Settings> {
        if self.last == Some(current) {
            return None;
        }
        self.last = Some(current);
        Some(current)
    }

    /// Observe and hand a changed snapshot to every listener
    pub fn notify(&mut self, current: Settings, listeners: &mut [&mut dyn SettingsListener]) -> bool {
        match self.observe(current) {
            Some(settings) => {
                for listener in listeners.iter_mut() {
                    listener.on_settings_changed(&settings);
                }
                true
            }
            None => false,
        }
    }
}

/// Background thread polling a settings source every [`REFRESH_DELAY`]
///
/// Changed snapshots are sent over the channel; the receiving side applies
/// them between two simulation ticks.
pub struct SettingsPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SettingsPoller {
    /// Poll `source`, which returns `None` when no settings are available
    pub fn spawn<F>(mut source: F, sender: Sender<Settings>) -> Self
    where
        F: FnMut() -> Option<Settings> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut watcher = SettingsWatcher::new();
            while !thread_stop.load(Ordering::Relaxed) {
                if let Some(changed) = source().and_then(|current| watcher.observe(current)) {
                    debug!("Settings changed: {:?}", changed);
                    if sender.send(changed).is_err() {
                        // Receiver is gone, nobody is listening anymore
                        break;
                    }
                }
                thread::sleep(REFRESH_DELAY);
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Poll a JSON settings file
    pub fn watch_file(path: PathBuf, sender: Sender<Settings>) -> Self {
        let mut last_error: Option<String> = None;
        Self::spawn(
            move || match Settings::load(&path) {
                Ok(settings) => {
                    last_error = None;
                    Some(settings)
                }
                Err(err) => {
                    let message = format!("{:#}", err);
                    if last_error.as_ref() != Some(&message) {
                        warn!("Ignoring settings file: {}", message);
                        last_error = Some(message);
                    }
                    None
                }
            },
            sender,
        )
    }

    /// Stop polling and wait for the thread to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Settings poller thread panicked");
            }
        }
    }
}

impl Drop for SettingsPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
