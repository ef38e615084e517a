//! Per-period consumption accounts
//!
//! A [`PeriodAccount`] combines a persisted baseline (liters finalized
//! before the current external accumulator started counting) with the live
//! accumulator reading, and knows when its calendar boundary has been
//! crossed. Six instances cover the hourly through lifetime periods; the
//! boundary-crossing rule itself lives on [`Period`].

use aquastat_core::period::Period;
use aquastat_core::types::ML_PER_L;
use chrono::DateTime;
use chrono_tz::Tz;

/// One accounting period's baseline and reset boundary
#[derive(Debug, Clone)]
pub struct PeriodAccount {
    period: Period,
    /// Liters accumulated before the current external accumulator started
    baseline: f64,
    /// Wall-clock instant this period's current window began
    reset_at: DateTime<Tz>,
}

impl PeriodAccount {
    /// Create a fresh account starting now with a zero baseline
    pub fn new(period: Period, now: DateTime<Tz>) -> Self {
        Self {
            period,
            baseline: 0.0,
            reset_at: now,
        }
    }

    /// Restore an account from persisted state
    pub fn restore(period: Period, baseline: f64, reset_at: DateTime<Tz>) -> Self {
        Self {
            period,
            baseline,
            reset_at,
        }
    }

    /// The period this account tracks
    pub fn period(&self) -> Period {
        self.period
    }

    /// Persisted baseline in liters
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// When this period's current window began
    pub fn reset_at(&self) -> DateTime<Tz> {
        self.reset_at
    }

    /// Current period total in liters given the live accumulator reading (mL)
    pub fn current_volume(&self, external_ml: f64) -> f64 {
        self.baseline + external_ml / ML_PER_L
    }

    /// Whether the wall clock has passed this period's next calendar boundary
    pub fn crossed(&self, now: DateTime<Tz>) -> bool {
        self.period.crossed(self.reset_at, now)
    }

    /// Finalize the current window and start a new one
    ///
    /// Returns the finalized volume (baseline plus live accumulator) for
    /// archiving. The caller must reset the external accumulator toward
    /// [`Period::next_boundary`] in the same critical section, so no reader
    /// observes a zeroed baseline paired with a stale `reset_at`.
    pub fn finalize_and_reset(&mut self, now: DateTime<Tz>, external_ml: f64) -> f64 {
        let finalized = self.current_volume(external_ml);
        self.baseline = 0.0;
        self.reset_at = now;
        finalized
    }

    /// Startup catch-up for a boundary crossed while the process was down
    ///
    /// No external accumulator exists yet, so the finalized volume is
    /// exactly the persisted baseline.
    pub fn rollover_baseline(&mut self, now: DateTime<Tz>) -> f64 {
        let finalized = self.baseline;
        self.baseline = 0.0;
        self.reset_at = now;
        finalized
    }
}
