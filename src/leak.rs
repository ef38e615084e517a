//! Water leak detection
//!
//! Two-state hysteresis classifier over the trailing-24h minimum flow rate.
//! The polarity is deliberate: a minimum flow that stays *above* the
//! threshold for a full 24 hours means the water never stopped running,
//! which points at a slow continuous leak rather than a high-flow spike.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Kind of leak state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakEventKind {
    /// Flow never dropped to the threshold over the trailing 24 hours
    WaterLeakDetected,
    /// Minimum flow returned to or below the threshold
    WaterLeakCleared,
}

impl LeakEventKind {
    /// Event name as emitted to consumers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaterLeakDetected => "water_leak_detected",
            Self::WaterLeakCleared => "water_leak_cleared",
        }
    }
}

impl fmt::Display for LeakEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A one-shot leak state transition notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakEvent {
    /// Which transition occurred
    pub kind: LeakEventKind,
    /// The minimum flow (L/min) that triggered the transition
    pub min_flow: f64,
    /// The threshold (L/min) in effect at transition time
    pub threshold: f64,
}

/// Two-state hysteresis leak classifier
#[derive(Debug, Clone)]
pub struct LeakDetector {
    threshold: f64,
    leaking: bool,
    pending: Option<LeakEvent>,
}

impl LeakDetector {
    /// Create a detector with the given threshold (L/min) and restored state
    pub fn new(threshold: f64, leaking: bool) -> Self {
        Self {
            threshold,
            leaking,
            pending: None,
        }
    }

    /// Current classification
    pub fn is_leaking(&self) -> bool {
        self.leaking
    }

    /// Configured threshold in L/min
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Change the threshold; takes effect on the next evaluation
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Evaluate one tick's `min_flow_24h` statistic
    ///
    /// `None` (insufficient data) leaves the state and any pending event
    /// untouched. A transition replaces an undrained pending event; the
    /// queue holds only the latest.
    pub fn evaluate(&mut self, min_flow_24h: Option<f64>) {
        let Some(min_flow) = min_flow_24h else {
            return;
        };

        if min_flow > self.threshold && !self.leaking {
            self.leaking = true;
            self.pending = Some(LeakEvent {
                kind: LeakEventKind::WaterLeakDetected,
                min_flow,
                threshold: self.threshold,
            });
            warn!(
                "Water leak detected: min flow {:.3} L/min exceeds threshold {:.3} L/min",
                min_flow, self.threshold
            );
        } else if min_flow <= self.threshold && self.leaking {
            self.leaking = false;
            self.pending = Some(LeakEvent {
                kind: LeakEventKind::WaterLeakCleared,
                min_flow,
                threshold: self.threshold,
            });
            info!("Water leak cleared: min flow {:.3} L/min", min_flow);
        }
    }

    /// Return and clear the pending event, exactly once
    pub fn drain_pending(&mut self) -> Option<LeakEvent> {
        self.pending.take()
    }

    /// Peek at the pending event without clearing it
    pub fn pending(&self) -> Option<&LeakEvent> {
        self.pending.as_ref()
    }
}
