//! The accounting engine
//!
//! Owns the six period accounts, the four statistics buffers, and the leak
//! detector, and drives them all from telemetry ticks. Exactly one context
//! mutates the engine (the serialized tick callback); readers go through the
//! service's lock, so every tick's mutations land as one atomic unit.

use crate::account::PeriodAccount;
use crate::leak::{LeakDetector, LeakEvent};
use crate::store::{SnapshotData, parse_reset};
use crate::transport::MeterTransport;
use crate::window::{DAY_SECS, FlowStats, HOUR_SECS, MONTH_SECS, Sample, SlidingWindow, WEEK_SECS};
use aquastat_core::period::Period;
use aquastat_core::types::{EngineConfig, WaterTariff};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Convert a timestamp to epoch seconds with sub-second precision
fn epoch_secs(dt: DateTime<Tz>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

fn period_index(period: Period) -> usize {
    match period {
        Period::Hourly => 0,
        Period::Daily => 1,
        Period::Weekly => 2,
        Period::Monthly => 3,
        Period::Yearly => 4,
        Period::Lifetime => 5,
    }
}

/// The ten derived flow/consumption statistics
///
/// Every field is `None` when the backing buffer holds no qualifying
/// entries; insufficient data is never reported as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowStatistics {
    /// Average flow rate over the last hour (L/min)
    pub avg_flow_1h: Option<f64>,
    /// Peak flow rate over the last 24 hours (L/min)
    pub peak_flow_24h: Option<f64>,
    /// Peak flow rate over the last 7 days (L/min)
    pub peak_flow_7d: Option<f64>,
    /// Minimum flow rate over the last 24 hours (L/min)
    pub min_flow_24h: Option<f64>,
    /// Average hourly consumption over the last 24 hours (L)
    pub avg_hourly_24h: Option<f64>,
    /// Peak hourly consumption over the last 24 hours (L)
    pub peak_hourly_24h: Option<f64>,
    /// Peak hourly consumption over the last 7 days (L)
    pub peak_hourly_7d: Option<f64>,
    /// Average daily consumption over the last 7 days (L)
    pub avg_daily_7d: Option<f64>,
    /// Average daily consumption over the last 30 days (L)
    pub avg_daily_30d: Option<f64>,
    /// Peak daily consumption over the last 30 days (L)
    pub peak_daily_30d: Option<f64>,
}

/// Buffer sizes, exposed for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferCounts {
    /// Entries in the flow-sample buffer (1 h retention)
    pub flow_samples: usize,
    /// Entries in the hourly-consumption buffer (7 d retention)
    pub hourly_consumption: usize,
    /// Entries in the daily-consumption buffer (30 d retention)
    pub daily_consumption: usize,
    /// Entries in the hourly flow-stats buffer (7 d retention)
    pub hourly_flow_stats: usize,
}

/// Time-windowed accounting and statistics engine
pub struct AccountingEngine {
    transport: Arc<dyn MeterTransport>,
    config: EngineConfig,
    leak: LeakDetector,

    // Latest instantaneous values
    flow_rate: f64,
    volume_delta: f64,
    volume_last_reset: DateTime<Tz>,

    // Indexed by period, in Period::ALL order
    accounts: [PeriodAccount; 6],

    // Within-hour flow trackers; min starts from the hour's first sample so
    // a monotonically zero flow is represented correctly
    hourly_max_flow: f64,
    hourly_min_flow: Option<f64>,

    flow_samples: SlidingWindow<Sample>,
    hourly_consumption: SlidingWindow<Sample>,
    hourly_flow_stats: SlidingWindow<FlowStats>,
    daily_consumption: SlidingWindow<Sample>,
}

impl AccountingEngine {
    /// Create a fresh engine with every period starting now
    pub fn new(transport: Arc<dyn MeterTransport>, config: EngineConfig, now: DateTime<Tz>) -> Self {
        Self::from_snapshot(transport, config, None, now)
    }

    /// Create an engine, restoring persisted state when a snapshot exists
    ///
    /// Call [`handle_stale_boundaries`](Self::handle_stale_boundaries) and
    /// then [`register_accumulators`](Self::register_accumulators) before
    /// feeding ticks.
    pub fn from_snapshot(
        transport: Arc<dyn MeterTransport>,
        config: EngineConfig,
        snapshot: Option<SnapshotData>,
        now: DateTime<Tz>,
    ) -> Self {
        let tz = config.timezone.tz;
        let data = snapshot.unwrap_or_default();

        let accounts = [
            PeriodAccount::restore(
                Period::Hourly,
                data.hourly_volume,
                parse_reset(data.hourly_reset.as_deref(), tz, now),
            ),
            PeriodAccount::restore(
                Period::Daily,
                data.daily_volume,
                parse_reset(data.daily_reset.as_deref(), tz, now),
            ),
            PeriodAccount::restore(
                Period::Weekly,
                data.weekly_volume,
                parse_reset(data.weekly_reset.as_deref(), tz, now),
            ),
            PeriodAccount::restore(
                Period::Monthly,
                data.monthly_volume,
                parse_reset(data.monthly_reset.as_deref(), tz, now),
            ),
            PeriodAccount::restore(
                Period::Yearly,
                data.yearly_volume,
                parse_reset(data.yearly_reset.as_deref(), tz, now),
            ),
            PeriodAccount::restore(Period::Lifetime, data.lifetime_volume, now),
        ];

        let leak = LeakDetector::new(config.leak_threshold, data.water_leak_detected);

        Self {
            transport,
            config,
            leak,
            flow_rate: 0.0,
            volume_delta: 0.0,
            volume_last_reset: now,
            accounts,
            hourly_max_flow: data.hourly_max_flow,
            hourly_min_flow: data.hourly_min_flow,
            flow_samples: SlidingWindow::from_entries(HOUR_SECS, data.flow_samples),
            hourly_consumption: SlidingWindow::from_entries(WEEK_SECS, data.hourly_consumption),
            hourly_flow_stats: SlidingWindow::from_entries(WEEK_SECS, data.hourly_flow_stats),
            daily_consumption: SlidingWindow::from_entries(MONTH_SECS, data.daily_consumption),
        }
    }

    // -- Tick processing --

    /// Process one telemetry tick
    ///
    /// Returns `false` without touching any state when the device is
    /// unavailable; unavailable readings must not pollute statistics or
    /// trigger spurious boundary crossings.
    pub fn on_tick(&mut self, now: DateTime<Tz>) -> bool {
        if !self.transport.availability() {
            debug!("Device unavailable; skipping tick");
            return false;
        }

        let now_ts = epoch_secs(now);

        // The delta reading resets device-side on read; capture it once.
        self.volume_delta = self.transport.volume_delta();
        self.flow_rate = self.transport.flow_rate();
        self.volume_last_reset = now;

        // Boundaries first: a tick that crosses into a new hour belongs to
        // the new hour, so the closing hour's stats archive only the samples
        // recorded within it.
        self.check_period_boundaries(now);

        self.hourly_min_flow = Some(match self.hourly_min_flow {
            Some(min) => min.min(self.flow_rate),
            None => self.flow_rate,
        });
        self.hourly_max_flow = self.hourly_max_flow.max(self.flow_rate);

        self.flow_samples.append(Sample::new(now_ts, self.flow_rate));
        self.trim_buffers(now_ts);

        let min_flow = self.hourly_flow_stats.windowed_low(DAY_SECS, now_ts);
        self.leak.evaluate(min_flow);

        true
    }

    /// Check and handle boundary crossings, hour before day before week
    /// before month before year, so a simultaneous crossing archives the
    /// last hour's volume before any larger baseline zeroes. Each period's
    /// crossing is independent; one does not gate another.
    fn check_period_boundaries(&mut self, now: DateTime<Tz>) {
        for period in Period::RESETTABLE {
            let idx = period_index(period);
            if !self.accounts[idx].crossed(now) {
                continue;
            }

            let external_ml = self.transport.accumulated_volume(period);
            let archived_at = epoch_secs(self.accounts[idx].reset_at());
            let finalized = self.accounts[idx].finalize_and_reset(now, external_ml);

            match period {
                Period::Hourly => {
                    self.hourly_consumption
                        .append(Sample::new(archived_at, finalized));
                    if let Some(min) = self.hourly_min_flow {
                        self.hourly_flow_stats.append(FlowStats::new(
                            archived_at,
                            self.hourly_max_flow,
                            min,
                        ));
                    }
                    self.hourly_max_flow = 0.0;
                    self.hourly_min_flow = None;
                }
                Period::Daily => {
                    self.daily_consumption
                        .append(Sample::new(archived_at, finalized));
                }
                _ => {}
            }

            self.transport
                .reset_accumulator(period, period.next_boundary(now));
            debug!("Finalized {} period: {:.3} L", period, finalized);
        }
    }

    /// Handle boundaries crossed while the process was not running
    ///
    /// Runs once at startup, before
    /// [`register_accumulators`](Self::register_accumulators): no external
    /// accumulator exists yet, so each stale period archives exactly its
    /// persisted baseline, and a boundary already in the past is not
    /// re-detected on the first live tick.
    pub fn handle_stale_boundaries(&mut self, now: DateTime<Tz>) {
        for period in Period::RESETTABLE {
            let idx = period_index(period);
            if !self.accounts[idx].crossed(now) {
                continue;
            }

            let archived_at = epoch_secs(self.accounts[idx].reset_at());
            let finalized = self.accounts[idx].rollover_baseline(now);

            match period {
                Period::Hourly => {
                    self.hourly_consumption
                        .append(Sample::new(archived_at, finalized));
                    if let Some(min) = self.hourly_min_flow {
                        self.hourly_flow_stats.append(FlowStats::new(
                            archived_at,
                            self.hourly_max_flow,
                            min,
                        ));
                    }
                    self.hourly_max_flow = 0.0;
                    self.hourly_min_flow = None;
                }
                Period::Daily => {
                    self.daily_consumption
                        .append(Sample::new(archived_at, finalized));
                }
                _ => {}
            }

            debug!(
                "Rolled over stale {} period from restart: {:.3} L",
                period, finalized
            );
        }
    }

    /// Register external accumulators for all six periods
    pub fn register_accumulators(&self, now: DateTime<Tz>) {
        for period in Period::ALL {
            self.transport
                .add_accumulator(period, period.next_boundary(now));
        }
    }

    fn trim_buffers(&mut self, now_ts: f64) {
        self.flow_samples.trim(now_ts);
        self.hourly_consumption.trim(now_ts);
        self.hourly_flow_stats.trim(now_ts);
        self.daily_consumption.trim(now_ts);
    }

    // -- Current values --

    /// Latest instantaneous flow rate in L/min
    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    /// Latest captured volume delta in mL
    pub fn volume_delta(&self) -> f64 {
        self.volume_delta
    }

    /// When the volume delta was last captured
    pub fn volume_last_reset(&self) -> DateTime<Tz> {
        self.volume_last_reset
    }

    // -- Period accounting --

    /// Current consumption for a period, in liters
    pub fn volume(&self, period: Period) -> f64 {
        self.accounts[period_index(period)]
            .current_volume(self.transport.accumulated_volume(period))
    }

    /// Current cost for a period under the configured tariff
    pub fn cost(&self, period: Period) -> f64 {
        self.config.tariff.cost_for_volume(self.volume(period))
    }

    /// When a period's current window began
    pub fn reset_at(&self, period: Period) -> DateTime<Tz> {
        self.accounts[period_index(period)].reset_at()
    }

    // -- Statistics --

    /// All ten derived statistics as of `now`
    pub fn statistics(&self, now: DateTime<Tz>) -> FlowStatistics {
        let now_ts = epoch_secs(now);
        FlowStatistics {
            avg_flow_1h: self.flow_samples.windowed_average(HOUR_SECS, now_ts),
            peak_flow_24h: self.hourly_flow_stats.windowed_peak(DAY_SECS, now_ts),
            peak_flow_7d: self.hourly_flow_stats.windowed_peak(WEEK_SECS, now_ts),
            min_flow_24h: self.hourly_flow_stats.windowed_low(DAY_SECS, now_ts),
            avg_hourly_24h: self.hourly_consumption.windowed_average(DAY_SECS, now_ts),
            peak_hourly_24h: self.hourly_consumption.windowed_max(DAY_SECS, now_ts),
            peak_hourly_7d: self.hourly_consumption.windowed_max(WEEK_SECS, now_ts),
            avg_daily_7d: self.daily_consumption.windowed_average(WEEK_SECS, now_ts),
            avg_daily_30d: self.daily_consumption.windowed_average(MONTH_SECS, now_ts),
            peak_daily_30d: self.daily_consumption.windowed_max(MONTH_SECS, now_ts),
        }
    }

    /// Buffer sizes for diagnostics
    pub fn buffer_counts(&self) -> BufferCounts {
        BufferCounts {
            flow_samples: self.flow_samples.len(),
            hourly_consumption: self.hourly_consumption.len(),
            daily_consumption: self.daily_consumption.len(),
            hourly_flow_stats: self.hourly_flow_stats.len(),
        }
    }

    // -- Leak detection --

    /// Current leak classification
    pub fn water_leak_detected(&self) -> bool {
        self.leak.is_leaking()
    }

    /// Return and clear the pending leak event, exactly once
    pub fn drain_pending_leak_event(&mut self) -> Option<LeakEvent> {
        self.leak.drain_pending()
    }

    // -- Configuration --

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the tariff; affects every subsequent cost read
    pub fn set_tariff(&mut self, tariff: WaterTariff) {
        self.config.tariff = tariff;
    }

    /// Replace the leak threshold; takes effect on the next tick
    pub fn set_leak_threshold(&mut self, threshold: f64) {
        self.config.leak_threshold = threshold;
        self.leak.set_threshold(threshold);
    }

    // -- Persistence --

    /// Consistent point-in-time copy of all persisted state
    ///
    /// Period volumes are recorded as current totals (baseline plus live
    /// accumulator), so restoring folds the live contribution into the new
    /// baseline.
    pub fn snapshot(&self) -> SnapshotData {
        SnapshotData {
            lifetime_volume: self.volume(Period::Lifetime),
            hourly_volume: self.volume(Period::Hourly),
            hourly_reset: Some(self.reset_at(Period::Hourly).to_rfc3339()),
            daily_volume: self.volume(Period::Daily),
            daily_reset: Some(self.reset_at(Period::Daily).to_rfc3339()),
            weekly_volume: self.volume(Period::Weekly),
            weekly_reset: Some(self.reset_at(Period::Weekly).to_rfc3339()),
            monthly_volume: self.volume(Period::Monthly),
            monthly_reset: Some(self.reset_at(Period::Monthly).to_rfc3339()),
            yearly_volume: self.volume(Period::Yearly),
            yearly_reset: Some(self.reset_at(Period::Yearly).to_rfc3339()),
            hourly_max_flow: self.hourly_max_flow,
            hourly_min_flow: self.hourly_min_flow,
            flow_samples: self.flow_samples.to_vec(),
            hourly_consumption: self.hourly_consumption.to_vec(),
            daily_consumption: self.daily_consumption.to_vec(),
            hourly_flow_stats: self.hourly_flow_stats.to_vec(),
            water_leak_detected: self.leak.is_leaking(),
        }
    }
}
