//! Day-by-day free-space projection
//!
//! The forecast is a lazy iterator consumed once. It starts at the last
//! snapshot and steps one day at a time until projected free space hits zero
//! or the horizon is reached. A flat or growing trend produces nothing.

use crate::models::Snapshot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Forecast horizon in days after the last snapshot
pub const MAX_FORECAST_DAYS: u32 = 30;

/// One projected point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub projected_free_bytes: u64,
}

/// Lazy, finite projection; build a new one to start over
#[derive(Debug)]
pub struct Forecast {
    origin: DateTime<Utc>,
    start_free: f64,
    bytes_per_day: f64,
    next_day: u32,
    done: bool,
}

impl Forecast {
    pub(crate) fn new(last: &Snapshot, bytes_per_day: f64) -> Self {
        Self {
            origin: last.timestamp,
            start_free: last.free_bytes as f64,
            bytes_per_day,
            next_day: 0,
            done: bytes_per_day <= 0.0,
        }
    }

    /// A forecast that yields nothing
    pub fn empty() -> Self {
        Self {
            origin: DateTime::<Utc>::MIN_UTC,
            start_free: 0.0,
            bytes_per_day: 0.0,
            next_day: 0,
            done: true,
        }
    }
}

impl Iterator for Forecast {
    type Item = ForecastPoint;

    fn next(&mut self) -> Option<ForecastPoint> {
        if self.done {
            return None;
        }

        let day = self.next_day;
        let projected = (self.start_free - self.bytes_per_day * day as f64)
            .max(0.0)
            .round() as u64;

        self.next_day += 1;
        if projected == 0 || day >= MAX_FORECAST_DAYS {
            self.done = true;
        }

        Some(ForecastPoint {
            date: self.origin + Duration::days(day as i64),
            projected_free_bytes: projected,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (1, Some((MAX_FORECAST_DAYS + 1 - self.next_day) as usize))
        }
    }
}

impl std::iter::FusedIterator for Forecast {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const GB: u64 = 1_000_000_000;

    fn last(free: u64) -> Snapshot {
        let ts = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
        Snapshot::new(ts, free, 500 * GB).unwrap()
    }

    #[test]
    fn test_forecast_runs_to_zero() {
        let points: Vec<_> = Forecast::new(&last(90 * GB), 10.0 * GB as f64).collect();

        assert_eq!(points.len(), 10);
        assert_eq!(points[0].projected_free_bytes, 90 * GB);
        assert_eq!(points[1].projected_free_bytes, 80 * GB);
        assert_eq!(points.last().unwrap().projected_free_bytes, 0);
        assert_eq!(points[9].date - points[0].date, Duration::days(9));
    }

    #[test]
    fn test_forecast_capped_at_horizon() {
        let points: Vec<_> = Forecast::new(&last(400 * GB), GB as f64).collect();

        assert_eq!(points.len(), MAX_FORECAST_DAYS as usize + 1);
        assert_eq!(points.last().unwrap().projected_free_bytes, 370 * GB);
    }

    #[test]
    fn test_forecast_monotonic_and_non_negative() {
        let points: Vec<_> = Forecast::new(&last(95 * GB), 7.3 * GB as f64).collect();

        assert!(points.len() <= 31);
        assert!(points
            .windows(2)
            .all(|w| w[1].projected_free_bytes <= w[0].projected_free_bytes));
        assert_eq!(points.last().unwrap().projected_free_bytes, 0);
    }

    #[test]
    fn test_no_forecast_when_not_shrinking() {
        assert_eq!(Forecast::new(&last(50 * GB), -5.0 * GB as f64).count(), 0);
        assert_eq!(Forecast::new(&last(50 * GB), 0.0).count(), 0);
        assert_eq!(Forecast::empty().count(), 0);
    }

    #[test]
    fn test_forecast_not_restartable() {
        let mut forecast = Forecast::new(&last(20 * GB), 10.0 * GB as f64);
        assert_eq!(forecast.by_ref().count(), 3);
        assert!(forecast.next().is_none());
    }

    #[test]
    fn test_already_full_volume() {
        let points: Vec<_> = Forecast::new(&last(0), GB as f64).collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].projected_free_bytes, 0);
    }
}
