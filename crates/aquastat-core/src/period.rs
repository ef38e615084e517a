//! Accounting periods and their calendar boundaries
//!
//! Each consumption total is tracked over one of six accounting periods.
//! Boundary checks use the configured local calendar, never fixed durations:
//! "new day" means local midnight, a month is however long the month is, and
//! DST transitions shift the UTC offset without skipping or double-firing a
//! boundary.
//!
//! # Examples
//! ```
//! use aquastat_core::period::Period;
//! use chrono::TimeZone;
//! use chrono_tz::Tz;
//!
//! let tz = Tz::UTC;
//! let before = tz.with_ymd_and_hms(2024, 3, 1, 10, 59, 0).unwrap();
//! let after = tz.with_ymd_and_hms(2024, 3, 1, 11, 0, 1).unwrap();
//! assert!(Period::Hourly.crossed(before, after));
//! assert!(!Period::Daily.crossed(before, after));
//! ```

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six accounting periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Resets at the top of every hour
    Hourly,
    /// Resets at local midnight
    Daily,
    /// Resets Monday at local midnight
    Weekly,
    /// Resets on the first of the month at local midnight
    Monthly,
    /// Resets January 1 at local midnight
    Yearly,
    /// Never resets
    Lifetime,
}

impl Period {
    /// All periods, in boundary-check order
    pub const ALL: [Period; 6] = [
        Period::Hourly,
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Yearly,
        Period::Lifetime,
    ];

    /// Periods with a reset boundary, in the fixed order boundary crossings
    /// are checked (hour before day, so a simultaneous crossing archives the
    /// last hour's volume before the day baseline zeroes).
    pub const RESETTABLE: [Period; 5] = [
        Period::Hourly,
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Yearly,
    ];

    /// The period name used for accumulator registration and persistence keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }

    /// Local-calendar start of the period containing `dt`
    ///
    /// For `Lifetime` this returns `dt` unchanged; a lifetime period has no
    /// meaningful start and never crosses.
    pub fn start_of(&self, dt: DateTime<Tz>) -> DateTime<Tz> {
        match self.naive_start_of(dt.naive_local()) {
            Some(naive) => resolve_local(dt.timezone(), naive),
            None => dt,
        }
    }

    /// The boundary instant following `dt`, used as the external
    /// accumulator's target reset time
    ///
    /// For `Lifetime` this is a far-future sentinel.
    pub fn next_boundary(&self, dt: DateTime<Tz>) -> DateTime<Tz> {
        let tz = dt.timezone();
        let local = dt.naive_local();
        let date = local.date();
        let naive = match self {
            Self::Hourly => {
                date.and_time(NaiveTime::MIN) + Duration::hours(local.hour() as i64 + 1)
            }
            Self::Daily => (date + Days::new(1)).and_time(NaiveTime::MIN),
            Self::Weekly => {
                let week_start = date - Days::new(date.weekday().num_days_from_monday() as u64);
                (week_start + Days::new(7)).and_time(NaiveTime::MIN)
            }
            Self::Monthly => {
                let month_start = date - Days::new(date.day() as u64 - 1);
                (month_start + Months::new(1)).and_time(NaiveTime::MIN)
            }
            Self::Yearly => {
                let year_start = date - Days::new(date.ordinal0() as u64);
                (year_start + Months::new(12)).and_time(NaiveTime::MIN)
            }
            Self::Lifetime => NaiveDate::from_ymd_opt(9999, 12, 31)
                .unwrap_or(NaiveDate::MAX)
                .and_time(NaiveTime::MIN),
        };
        resolve_local(tz, naive)
    }

    /// Whether the wall clock has passed the calendar boundary following
    /// `reset_at`
    ///
    /// Compares local-calendar period starts, so the predicate holds for any
    /// `now` past the boundary (including boundaries crossed while the
    /// process was not running) and cannot fire twice for the same boundary.
    /// Always false for `Lifetime`.
    pub fn crossed(&self, reset_at: DateTime<Tz>, now: DateTime<Tz>) -> bool {
        match (
            self.naive_start_of(now.naive_local()),
            self.naive_start_of(reset_at.naive_local()),
        ) {
            (Some(now_start), Some(reset_start)) => now_start > reset_start,
            _ => false,
        }
    }

    /// Start of the period containing `local`, in local naive time.
    /// `None` for `Lifetime`.
    fn naive_start_of(&self, local: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = local.date();
        match self {
            Self::Hourly => {
                Some(date.and_time(NaiveTime::MIN) + Duration::hours(local.hour() as i64))
            }
            Self::Daily => Some(date.and_time(NaiveTime::MIN)),
            Self::Weekly => {
                let week_start = date - Days::new(date.weekday().num_days_from_monday() as u64);
                Some(week_start.and_time(NaiveTime::MIN))
            }
            Self::Monthly => {
                Some((date - Days::new(date.day() as u64 - 1)).and_time(NaiveTime::MIN))
            }
            Self::Yearly => Some((date - Days::new(date.ordinal0() as u64)).and_time(NaiveTime::MIN)),
            Self::Lifetime => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = crate::error::AquastatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "lifetime" => Ok(Self::Lifetime),
            _ => Err(crate::error::AquastatError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Map a naive local datetime onto the timezone's timeline
///
/// Ambiguous instants (DST fall-back) resolve to the earliest mapping.
/// Instants skipped by a DST gap shift forward one hour.
pub fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    use chrono::LocalResult;
    use chrono::TimeZone;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        }
    }
}
