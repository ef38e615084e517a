//! Shared test fixtures

use aquastat::transport::MeterTransport;
use aquastat_core::Period;
use chrono::DateTime;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory meter with settable readings and a command log
pub struct FakeMeter {
    flow_rate: Mutex<f64>,
    volume_delta: Mutex<f64>,
    available: Mutex<bool>,
    accumulated: Mutex<HashMap<Period, f64>>,
    /// (period, target) pairs from add_accumulator calls
    pub registered: Mutex<Vec<(Period, DateTime<Tz>)>>,
    /// (period, next target) pairs from reset_accumulator calls
    pub resets: Mutex<Vec<(Period, DateTime<Tz>)>>,
}

impl FakeMeter {
    pub fn new() -> Self {
        Self {
            flow_rate: Mutex::new(0.0),
            volume_delta: Mutex::new(0.0),
            available: Mutex::new(true),
            accumulated: Mutex::new(HashMap::new()),
            registered: Mutex::new(Vec::new()),
            resets: Mutex::new(Vec::new()),
        }
    }

    pub fn set_flow_rate(&self, rate: f64) {
        *self.flow_rate.lock().unwrap() = rate;
    }

    pub fn set_volume_delta(&self, ml: f64) {
        *self.volume_delta.lock().unwrap() = ml;
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap() = available;
    }

    pub fn set_accumulated(&self, period: Period, ml: f64) {
        self.accumulated.lock().unwrap().insert(period, ml);
    }
}

impl MeterTransport for FakeMeter {
    fn flow_rate(&self) -> f64 {
        *self.flow_rate.lock().unwrap()
    }

    fn volume_delta(&self) -> f64 {
        *self.volume_delta.lock().unwrap()
    }

    fn availability(&self) -> bool {
        *self.available.lock().unwrap()
    }

    fn accumulated_volume(&self, period: Period) -> f64 {
        self.accumulated
            .lock()
            .unwrap()
            .get(&period)
            .copied()
            .unwrap_or(0.0)
    }

    fn add_accumulator(&self, period: Period, target_reset_at: DateTime<Tz>) {
        self.accumulated.lock().unwrap().insert(period, 0.0);
        self.registered.lock().unwrap().push((period, target_reset_at));
    }

    fn reset_accumulator(&self, period: Period, next_target_reset_at: DateTime<Tz>) {
        self.accumulated.lock().unwrap().insert(period, 0.0);
        self.resets.lock().unwrap().push((period, next_target_reset_at));
    }
}
