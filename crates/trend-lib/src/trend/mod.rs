//! Free-space trend and time-to-full projection
//!
//! A trend is recomputed from a snapshot window on every request. Fewer than
//! two usable snapshots yield no trend rather than an error.

mod forecast;
mod regression;

pub use forecast::{Forecast, ForecastPoint, MAX_FORECAST_DAYS};
pub use regression::{fit, LinearFit};

use crate::models::Snapshot;
use serde::{Deserialize, Serialize};

/// Rates within this many bytes/day of zero count as stable (1 MB)
pub const STABLE_BAND_BYTES_PER_DAY: f64 = 1_000_000.0;

/// Rate of change of free space derived from a history window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Bytes consumed per day; positive means free space is shrinking
    pub bytes_per_day: f64,
    /// Span between the oldest and newest snapshot used
    pub period_hours: f64,
    pub data_points: usize,
    /// Whole days until free space reaches zero, only while shrinking
    pub days_until_full: Option<u64>,
    pub r_squared: f64,
    pub last_snapshot: Snapshot,
}

impl Trend {
    /// Compute a trend over `samples` (oldest first)
    pub fn compute(samples: &[Snapshot]) -> Option<Self> {
        let fitted = fit(samples)?;
        let (first, last) = (samples.first()?, samples.last()?);

        let bytes_per_day = -fitted.slope;
        let period_hours =
            (last.timestamp - first.timestamp).num_milliseconds() as f64 / 3_600_000.0;

        Some(Self {
            bytes_per_day,
            period_hours,
            data_points: samples.len(),
            days_until_full: days_until_full(last.free_bytes, bytes_per_day),
            r_squared: fitted.r_squared,
            last_snapshot: *last,
        })
    }

    pub fn direction(&self) -> TrendDirection {
        if self.bytes_per_day > STABLE_BAND_BYTES_PER_DAY {
            TrendDirection::Shrinking
        } else if self.bytes_per_day < -STABLE_BAND_BYTES_PER_DAY {
            TrendDirection::Growing
        } else {
            TrendDirection::Stable
        }
    }

    pub fn outlook(&self) -> Option<ForecastOutlook> {
        self.days_until_full.map(ForecastOutlook::from_days)
    }

    /// Daily projection of free space starting at the last snapshot
    pub fn forecast(&self) -> Forecast {
        Forecast::new(&self.last_snapshot, self.bytes_per_day)
    }
}

fn days_until_full(free_bytes: u64, bytes_per_day: f64) -> Option<u64> {
    if bytes_per_day <= 0.0 {
        return None;
    }
    // float-to-int casts saturate, so absurdly slow rates cap at u64::MAX
    Some((free_bytes as f64 / bytes_per_day).floor() as u64)
}

/// Direction of free-space change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Shrinking,
    Growing,
    Stable,
}

/// How soon a shrinking volume is projected to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastOutlook {
    /// Under a week
    Imminent,
    /// Under two weeks
    Soon,
    /// Inside the forecast horizon
    Approaching,
    Distant,
}

impl ForecastOutlook {
    pub fn from_days(days: u64) -> Self {
        match days {
            0..=6 => ForecastOutlook::Imminent,
            7..=13 => ForecastOutlook::Soon,
            14..=29 => ForecastOutlook::Approaching,
            _ => ForecastOutlook::Distant,
        }
    }
}
