//! Bounded sliding-window statistics buffers
//!
//! The engine keeps four time-ordered buffers with fixed retention horizons
//! and answers average/peak/minimum queries over arbitrary sub-windows. All
//! timestamps are epoch seconds (f64) so sub-second tick spacing stays
//! unambiguous, and entries serialize as the `[ts, value]` /
//! `[ts, max, min]` arrays the snapshot document uses.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One hour in seconds
pub const HOUR_SECS: f64 = 3600.0;
/// One day in seconds
pub const DAY_SECS: f64 = 86400.0;
/// Seven days in seconds
pub const WEEK_SECS: f64 = 604_800.0;
/// Thirty days in seconds
pub const MONTH_SECS: f64 = DAY_SECS * 30.0;

/// A timestamped entry that can live in a sliding window
pub trait WindowEntry: Copy {
    /// Epoch-seconds timestamp of this entry
    fn timestamp(&self) -> f64;
}

/// A scalar sample: flow rate (L/min) or finalized consumption (L)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Sample {
    /// Epoch-seconds timestamp
    pub ts: f64,
    /// Sample value
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(ts: f64, value: f64) -> Self {
        Self { ts, value }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((ts, value): (f64, f64)) -> Self {
        Self { ts, value }
    }
}

impl From<Sample> for (f64, f64) {
    fn from(s: Sample) -> Self {
        (s.ts, s.value)
    }
}

impl WindowEntry for Sample {
    fn timestamp(&self) -> f64 {
        self.ts
    }
}

/// Max/min flow pair for one finalized hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, f64)", into = "(f64, f64, f64)")]
pub struct FlowStats {
    /// Epoch-seconds timestamp of the hour the pair describes
    pub ts: f64,
    /// Maximum flow rate observed during the hour (L/min)
    pub max: f64,
    /// Minimum flow rate observed during the hour (L/min)
    pub min: f64,
}

impl FlowStats {
    /// Create a new flow stats entry
    pub fn new(ts: f64, max: f64, min: f64) -> Self {
        Self { ts, max, min }
    }
}

impl From<(f64, f64, f64)> for FlowStats {
    fn from((ts, max, min): (f64, f64, f64)) -> Self {
        Self { ts, max, min }
    }
}

impl From<FlowStats> for (f64, f64, f64) {
    fn from(s: FlowStats) -> Self {
        (s.ts, s.max, s.min)
    }
}

impl WindowEntry for FlowStats {
    fn timestamp(&self) -> f64 {
        self.ts
    }
}

/// Append-and-trim time-ordered buffer with a fixed retention horizon
///
/// Callers guarantee non-decreasing timestamps on append; this is not
/// enforced, and a violation only affects trim accuracy, never correctness
/// of the queries.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T: WindowEntry> {
    entries: VecDeque<T>,
    retention_secs: f64,
}

impl<T: WindowEntry> SlidingWindow<T> {
    /// Create an empty window with the given retention horizon in seconds
    pub fn new(retention_secs: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            retention_secs,
        }
    }

    /// Restore a window from persisted entries
    pub fn from_entries(retention_secs: f64, entries: Vec<T>) -> Self {
        Self {
            entries: entries.into(),
            retention_secs,
        }
    }

    /// Append an entry at the end of the window
    pub fn append(&mut self, entry: T) {
        self.entries.push_back(entry);
    }

    /// Drop every leading entry older than `now - retention`
    ///
    /// Idempotent: a second trim with the same `now` removes nothing.
    pub fn trim(&mut self, now_ts: f64) {
        let cutoff = now_ts - self.retention_secs;
        while let Some(front) = self.entries.front() {
            if front.timestamp() >= cutoff {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// Number of retained entries, exposed for diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with `timestamp >= now - window_secs`
    pub fn window_iter(&self, window_secs: f64, now_ts: f64) -> impl Iterator<Item = &T> {
        let cutoff = now_ts - window_secs;
        self.entries.iter().filter(move |e| e.timestamp() >= cutoff)
    }

    /// Snapshot of all retained entries, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().copied().collect()
    }
}

impl SlidingWindow<Sample> {
    /// Arithmetic mean of qualifying sample values; `None` if none qualify
    pub fn windowed_average(&self, window_secs: f64, now_ts: f64) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for sample in self.window_iter(window_secs, now_ts) {
            sum += sample.value;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Maximum qualifying sample value; `None` if none qualify
    pub fn windowed_max(&self, window_secs: f64, now_ts: f64) -> Option<f64> {
        self.window_iter(window_secs, now_ts)
            .map(|s| s.value)
            .reduce(f64::max)
    }

    /// Minimum qualifying sample value; `None` if none qualify
    pub fn windowed_min(&self, window_secs: f64, now_ts: f64) -> Option<f64> {
        self.window_iter(window_secs, now_ts)
            .map(|s| s.value)
            .reduce(f64::min)
    }
}

impl SlidingWindow<FlowStats> {
    /// Maximum over the `max` fields of qualifying entries
    pub fn windowed_peak(&self, window_secs: f64, now_ts: f64) -> Option<f64> {
        self.window_iter(window_secs, now_ts)
            .map(|s| s.max)
            .reduce(f64::max)
    }

    /// Minimum over the `min` fields of qualifying entries
    pub fn windowed_low(&self, window_secs: f64, now_ts: f64) -> Option<f64> {
        self.window_iter(window_secs, now_ts)
            .map(|s| s.min)
            .reduce(f64::min)
    }
}
