//! Snapshot persistence
//!
//! The engine's full state serializes into a single versioned JSON document
//! so period boundaries and statistics survive restarts. Loading never
//! fails hard: a missing file is a fresh install, an unknown version is
//! discarded with a warning, and an unparseable timestamp falls back to
//! "now" for that field alone.

use crate::window::{FlowStats, Sample};
use aquastat_core::error::Result;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current snapshot schema version
pub const STORAGE_VERSION: u32 = 1;

/// Default snapshot file name under the platform data directory
const SNAPSHOT_FILE: &str = "snapshot.json";

/// Persisted engine state
///
/// Field-by-field `#[serde(default)]` keeps loading total: any field a
/// future or past version omits simply takes its zero value. Period volumes
/// are saved as *current totals* (baseline plus live accumulator), so a
/// restart folds the live contribution into the restored baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Lifetime consumption in liters
    #[serde(default)]
    pub lifetime_volume: f64,
    /// Current-hour consumption in liters
    #[serde(default)]
    pub hourly_volume: f64,
    /// RFC 3339 start of the current hour window
    #[serde(default)]
    pub hourly_reset: Option<String>,
    /// Current-day consumption in liters
    #[serde(default)]
    pub daily_volume: f64,
    /// RFC 3339 start of the current day window
    #[serde(default)]
    pub daily_reset: Option<String>,
    /// Current-week consumption in liters
    #[serde(default)]
    pub weekly_volume: f64,
    /// RFC 3339 start of the current week window
    #[serde(default)]
    pub weekly_reset: Option<String>,
    /// Current-month consumption in liters
    #[serde(default)]
    pub monthly_volume: f64,
    /// RFC 3339 start of the current month window
    #[serde(default)]
    pub monthly_reset: Option<String>,
    /// Current-year consumption in liters
    #[serde(default)]
    pub yearly_volume: f64,
    /// RFC 3339 start of the current year window
    #[serde(default)]
    pub yearly_reset: Option<String>,
    /// Within-hour maximum flow tracker (L/min)
    #[serde(default)]
    pub hourly_max_flow: f64,
    /// Within-hour minimum flow tracker; `None` before the hour's first sample
    #[serde(default)]
    pub hourly_min_flow: Option<f64>,
    /// Flow-sample buffer entries as `[ts, L/min]`
    #[serde(default)]
    pub flow_samples: Vec<Sample>,
    /// Hourly-consumption buffer entries as `[ts, L]`
    #[serde(default)]
    pub hourly_consumption: Vec<Sample>,
    /// Daily-consumption buffer entries as `[ts, L]`
    #[serde(default)]
    pub daily_consumption: Vec<Sample>,
    /// Hourly flow stats buffer entries as `[ts, max, min]`
    #[serde(default)]
    pub hourly_flow_stats: Vec<FlowStats>,
    /// Restored leak classification
    #[serde(default)]
    pub water_leak_detected: bool,
}

/// Versioned wrapper written to disk
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    data: SnapshotData,
}

/// Parse a persisted RFC 3339 reset timestamp
///
/// Falls back to `default` (typically "now") when the field is missing or
/// unparseable; a bad timestamp must never fail the whole load.
pub fn parse_reset(value: Option<&str>, tz: Tz, default: DateTime<Tz>) -> DateTime<Tz> {
    match value {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed.with_timezone(&tz),
            Err(e) => {
                debug!("Ignoring unparseable reset timestamp '{}': {}", raw, e);
                default
            }
        },
        None => default,
    }
}

/// Loads and saves the snapshot document
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by the platform-default location
    /// (`<data_local_dir>/aquastat/snapshot.json`)
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aquastat")
            .join(SNAPSHOT_FILE)
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, if one exists and carries the current version
    pub async fn load(&self) -> Result<Option<SnapshotData>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}; starting fresh", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document: SnapshotDocument = match serde_json::from_slice(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Discarding unreadable snapshot {}: {}",
                    self.path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if document.version != STORAGE_VERSION {
            warn!(
                "Discarding snapshot {} with unsupported version {} (expected {})",
                self.path.display(),
                document.version,
                STORAGE_VERSION
            );
            return Ok(None);
        }

        Ok(Some(document.data))
    }

    /// Persist a snapshot atomically (write to a temp file, then rename)
    pub async fn save(&self, data: &SnapshotData) -> Result<()> {
        let document = SnapshotDocument {
            version: STORAGE_VERSION,
            data: data.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }
}
