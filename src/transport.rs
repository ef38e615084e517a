//! Transport seam to the metering device
//!
//! The engine never talks to the device directly; it consumes a narrow
//! interface the transport layer implements. Session management,
//! authentication, and reconnect policy all live behind this trait. The
//! transport guarantees serialized tick delivery, so the engine mutates
//! state from exactly one context.

use aquastat_core::period::Period;
use chrono::DateTime;
use chrono_tz::Tz;

/// Narrow interface onto the device connection layer
///
/// All readings are instantaneous getters refreshed by the transport on
/// every telemetry push. Accumulated volumes are monotonic within a period
/// and reset on command.
pub trait MeterTransport: Send + Sync {
    /// Current flow rate in L/min
    fn flow_rate(&self) -> f64;

    /// Volume delta in mL since the last read (device-side reset on read)
    fn volume_delta(&self) -> f64;

    /// Whether the device is currently reachable and reporting
    fn availability(&self) -> bool;

    /// Volume in mL accumulated for the named period since its last reset
    fn accumulated_volume(&self, period: Period) -> f64;

    /// Register an accumulator that counts toward `target_reset_at`
    fn add_accumulator(&self, period: Period, target_reset_at: DateTime<Tz>);

    /// Zero an accumulator and aim it at the next boundary
    fn reset_accumulator(&self, period: Period, next_target_reset_at: DateTime<Tz>);
}

/// Transport stand-in with no device behind it
///
/// Reports the device unavailable and every accumulator at zero. Used for
/// offline snapshot inspection, where period totals reduce to their
/// persisted baselines.
#[derive(Debug, Default)]
pub struct OfflineMeter;

impl MeterTransport for OfflineMeter {
    fn flow_rate(&self) -> f64 {
        0.0
    }

    fn volume_delta(&self) -> f64 {
        0.0
    }

    fn availability(&self) -> bool {
        false
    }

    fn accumulated_volume(&self, _period: Period) -> f64 {
        0.0
    }

    fn add_accumulator(&self, _period: Period, _target_reset_at: DateTime<Tz>) {}

    fn reset_accumulator(&self, _period: Period, _next_target_reset_at: DateTime<Tz>) {}
}
