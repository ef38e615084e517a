//! Core types, calendar periods, and utilities for aquastat
//!
//! This crate provides the foundational types, error handling, timezone
//! configuration, and local-calendar period boundary math used by the
//! aquastat accounting engine.

pub mod error;
pub mod period;
pub mod timezone;
pub mod types;

// Re-export commonly used types
pub use error::{AquastatError, Result};
pub use period::Period;
pub use timezone::TimezoneConfig;
pub use types::{EngineConfig, UnitSystem, WaterTariff};
