//! Core domain types for aquastat
//!
//! This module contains the fundamental types used throughout the aquastat
//! library: unit conversion constants, the unit system selector, the water
//! tariff, and the engine configuration.

use crate::timezone::TimezoneConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliliters per liter. The meter's accumulators count milliliters.
pub const ML_PER_L: f64 = 1000.0;

/// Liters per cubic meter, the metric billing unit.
pub const L_PER_M3: f64 = 1000.0;

/// Liters per US gallon, the US customary billing unit.
pub const L_PER_GAL: f64 = 3.78541;

/// Default water tariff (currency per billing unit). Zero disables costs.
pub const DEFAULT_WATER_TARIFF: f64 = 0.0;

/// Default leak detection threshold in L/min.
pub const DEFAULT_LEAK_THRESHOLD: f64 = 0.0;

/// Interval between periodic snapshot saves, in seconds.
pub const SAVE_INTERVAL_SECS: u64 = 300;

/// Unit system for cost calculation
///
/// Determines which billing unit the configured tariff is quoted in:
/// cubic meters for metric, gallons for US customary.
///
/// # Examples
/// ```
/// use aquastat_core::types::UnitSystem;
/// use std::str::FromStr;
///
/// let units = UnitSystem::from_str("metric").unwrap();
/// assert_eq!(units, UnitSystem::Metric);
/// assert_eq!(UnitSystem::UsCustomary.to_string(), "us_customary");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSystem {
    /// Tariff is per cubic meter
    #[default]
    Metric,
    /// Tariff is per US gallon
    UsCustomary,
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "metric"),
            Self::UsCustomary => write!(f, "us_customary"),
        }
    }
}

impl std::str::FromStr for UnitSystem {
    type Err = crate::error::AquastatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "us" | "us_customary" | "imperial" => Ok(Self::UsCustomary),
            _ => Err(crate::error::AquastatError::InvalidUnitSystem(
                s.to_string(),
            )),
        }
    }
}

/// Water tariff configuration
///
/// Converts consumed volume (liters) into a cost figure using the
/// configured rate and unit system. A rate of `0.0` disables costing and
/// every cost reads as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterTariff {
    /// Price per billing unit (m³ or gallon)
    pub rate: f64,
    /// Billing unit system
    pub unit_system: UnitSystem,
}

impl Default for WaterTariff {
    fn default() -> Self {
        Self {
            rate: DEFAULT_WATER_TARIFF,
            unit_system: UnitSystem::default(),
        }
    }
}

impl WaterTariff {
    /// Create a new tariff
    pub fn new(rate: f64, unit_system: UnitSystem) -> Self {
        Self { rate, unit_system }
    }

    /// Calculate the cost of a volume given in liters
    pub fn cost_for_volume(&self, volume_l: f64) -> f64 {
        if self.rate == 0.0 {
            return 0.0;
        }
        match self.unit_system {
            UnitSystem::Metric => volume_l / L_PER_M3 * self.rate,
            UnitSystem::UsCustomary => volume_l / L_PER_GAL * self.rate,
        }
    }
}

/// Engine configuration
///
/// Bundles the timezone used for calendar boundaries, the water tariff,
/// and the leak detection threshold (L/min).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timezone for period boundary computation
    pub timezone: TimezoneConfig,
    /// Tariff used for cost figures
    pub tariff: WaterTariff,
    /// Leak detection threshold in L/min
    pub leak_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: TimezoneConfig::default(),
            tariff: WaterTariff::default(),
            leak_threshold: DEFAULT_LEAK_THRESHOLD,
        }
    }
}
