//! Timezone utilities for period boundary handling
//!
//! Period boundaries ("new day" means local midnight) depend on the local
//! calendar, so the engine carries an explicit timezone. This module detects
//! the system's local timezone and parses timezone names from configuration.

use crate::error::{AquastatError, Result};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

/// Configuration for timezone handling
#[derive(Debug, Clone)]
pub struct TimezoneConfig {
    /// The timezone used for all calendar boundary computation
    pub tz: Tz,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            tz: get_local_timezone(),
        }
    }
}

impl TimezoneConfig {
    /// Create a configuration from an explicit timezone name, falling back
    /// to system detection when `name` is `None`.
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        match name {
            Some(tz_str) => {
                let tz = Tz::from_str(tz_str).map_err(|_| {
                    AquastatError::InvalidTimezone(format!(
                        "'{tz_str}'. Use format like 'America/New_York', 'Asia/Tokyo', or 'UTC'"
                    ))
                })?;
                Ok(Self { tz })
            }
            None => Ok(Self::default()),
        }
    }

    /// UTC configuration, mainly for tests and deterministic tooling
    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Get the display name for the configured timezone
    pub fn display_name(&self) -> &str {
        self.tz.name()
    }
}

/// Detect the system's local timezone
///
/// Checks the TZ environment variable first, then asks `iana-time-zone`.
/// Falls back to UTC if both fail.
pub fn get_local_timezone() -> Tz {
    if let Ok(tz_str) = std::env::var("TZ")
        && let Ok(tz) = Tz::from_str(&tz_str)
    {
        debug!("Using timezone from TZ environment variable: {}", tz_str);
        return tz;
    }

    match iana_time_zone::get_timezone() {
        Ok(tz_str) => match Tz::from_str(&tz_str) {
            Ok(tz) => {
                debug!("Using system timezone from iana-time-zone: {}", tz_str);
                tz
            }
            Err(_) => {
                debug!(
                    "Could not parse timezone from iana-time-zone: '{}', falling back to UTC",
                    tz_str
                );
                Tz::UTC
            }
        },
        Err(e) => {
            debug!(
                "Could not detect local timezone via iana-time-zone: {:?}, falling back to UTC",
                e
            );
            Tz::UTC
        }
    }
}
