//! Travel-time statistics for the roundabout
//!
//! Every vehicle that leaves the visible area lands in exactly one of three
//! buckets depending on how long its trip took.

use super::types::{BAD_REFERENCE_SPEED, MEDIUM_REFERENCE_SPEED, VEHICLE_LENGTH};

/// Travel-time quality of a trip, also used to grade the whole simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelTimeBucket {
    Good,
    Medium,
    Bad,
}

impl TravelTimeBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            TravelTimeBucket::Good => "good",
            TravelTimeBucket::Medium => "medium",
            TravelTimeBucket::Bad => "bad",
        }
    }
}

/// Number of completed trips per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketCounts {
    pub good: usize,
    pub medium: usize,
    pub bad: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.good + self.medium + self.bad
    }
}

/// Completed trip durations, in whole seconds, sorted into buckets
#[derive(Debug, Clone, Default)]
pub struct TravelTimeStats {
    good: Vec<u64>,
    medium: Vec<u64>,
    bad: Vec<u64>,
    /// Trips of at least this many seconds are medium
    medium_time: u32,
    /// Trips of at least this many seconds are bad
    bad_time: u32,
}

impl TravelTimeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(medium_time: u32, bad_time: u32) -> Self {
        Self {
            medium_time,
            bad_time,
            ..Self::default()
        }
    }

    /// Recompute thresholds from the distance a vehicle has to cover
    ///
    /// `visible_meters` is the extent of the visible area. The thresholds are
    /// the time needed to cross it, plus one vehicle length, at the medium
    /// and bad reference speeds.
    pub fn update_thresholds(&mut self, visible_meters: f32) {
        let distance = visible_meters + VEHICLE_LENGTH;
        self.medium_time = (distance / MEDIUM_REFERENCE_SPEED * 3.6) as u32;
        self.bad_time = (distance / BAD_REFERENCE_SPEED * 3.6) as u32;
    }

    /// Classify a trip duration given in whole seconds
    pub fn classify(&self, seconds: u64) -> TravelTimeBucket {
        if seconds < u64::from(self.medium_time) {
            TravelTimeBucket::Good
        } else if seconds < u64::from(self.bad_time) {
            TravelTimeBucket::Medium
        } else {
            TravelTimeBucket::Bad
        }
    }

    /// Store the life time of a finished vehicle, given in milliseconds
    pub fn record(&mut self, life_time_ms: u64) -> TravelTimeBucket {
        let seconds = life_time_ms / 1000;
        let bucket = self.classify(seconds);
        match bucket {
            TravelTimeBucket::Good => self.good.push(seconds),
            TravelTimeBucket::Medium => self.medium.push(seconds),
            TravelTimeBucket::Bad => self.bad.push(seconds),
        }
        bucket
    }

    /// Mean trip duration in whole seconds, 0 when no trip has completed
    pub fn average_life_time(&self) -> u64 {
        let count = self.completed();
        if count == 0 {
            return 0;
        }

        let sum: u64 = self
            .good
            .iter()
            .chain(&self.medium)
            .chain(&self.bad)
            .sum();
        sum / count as u64
    }

    /// Grade for the current average, as shown by the status indicator
    pub fn quality(&self) -> TravelTimeBucket {
        let average = self.average_life_time();
        if average <= u64::from(self.medium_time) {
            TravelTimeBucket::Good
        } else if average <= u64::from(self.bad_time) {
            TravelTimeBucket::Medium
        } else {
            TravelTimeBucket::Bad
        }
    }

    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            good: self.good.len(),
            medium: self.medium.len(),
            bad: self.bad.len(),
        }
    }

    pub fn completed(&self) -> usize {
        self.good.len() + self.medium.len() + self.bad.len()
    }

    /// Bar heights for a histogram, each bucket relative to the largest one
    ///
    /// Returns `None` while there are no results to show.
    pub fn bar_heights(&self) -> Option<BucketShares> {
        let counts = self.counts();
        let largest = counts.good.max(counts.medium).max(counts.bad);
        if largest == 0 {
            return None;
        }

        let largest = largest as f32;
        Some(BucketShares {
            good: counts.good as f32 / largest,
            medium: counts.medium as f32 / largest,
            bad: counts.bad as f32 / largest,
        })
    }

    /// Percentage of completed trips that fell in each bucket
    pub fn percentages(&self) -> Option<BucketShares> {
        let counts = self.counts();
        let total = counts.total();
        if total == 0 {
            return None;
        }

        let total = total as f32;
        Some(BucketShares {
            good: 100.0 * counts.good as f32 / total,
            medium: 100.0 * counts.medium as f32 / total,
            bad: 100.0 * counts.bad as f32 / total,
        })
    }

    pub fn medium_time(&self) -> u32 {
        self.medium_time
    }

    pub fn bad_time(&self) -> u32 {
        self.bad_time
    }

    /// Forget all completed trips. Thresholds are kept.
    pub fn clear(&mut self) {
        self.good.clear();
        self.medium.clear();
        self.bad.clear();
    }
}

/// A value per bucket, used for graph proportions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketShares {
    pub good: f32,
    pub medium: f32,
    pub bad: f32,
}

/// Format simulated milliseconds as a clock, `hh:mm:ss.t`
pub fn format_elapsed_time(milliseconds: u64) -> String {
    let hours = milliseconds / 3_600_000;
    let minutes = milliseconds % 3_600_000 / 60_000;
    let seconds = milliseconds % 60_000 / 1000;
    let tenth = milliseconds % 1000 / 100;
    format!("{:02}:{:02}:{:02}.{}", hours, minutes, seconds, tenth)
}

/// Format a duration in seconds for humans, e.g. `1 hour 2 minutes 5 seconds`
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3600;
    let minutes = seconds % 3600 / 60;
    let seconds = seconds % 60;

    let mut parts = Vec::new();
    for (quantity, word) in [(days, "day"), (hours, "hour"), (minutes, "minute")] {
        if quantity > 0 {
            parts.push(plural(quantity, word));
        }
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(" ")
}

fn plural(quantity: u64, word: &str) -> String {
    if quantity > 1 {
        format!("{} {}s", quantity, word)
    } else {
        format!("{} {}", quantity, word)
    }
}
