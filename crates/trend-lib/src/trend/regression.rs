//! Least-squares fit of free space over elapsed days

use crate::models::Snapshot;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A fitted line: free bytes as a function of days since the first sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change in free bytes per day (negative when free space shrinks)
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Elapsed days of each snapshot relative to the first one
fn elapsed_days(samples: &[Snapshot]) -> Vec<f64> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    samples
        .iter()
        .map(|s| {
            let millis = (s.timestamp - first.timestamp).num_milliseconds() as f64;
            millis / 1_000.0 / SECONDS_PER_DAY
        })
        .collect()
}

/// Free bytes of each snapshot relative to the first one.
///
/// Differences of integers below 2^53 are exact, so an unchanging disk
/// yields all zeros regardless of its size.
fn relative_free(samples: &[Snapshot]) -> Vec<f64> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    samples
        .iter()
        .map(|s| s.free_bytes as f64 - first.free_bytes as f64)
        .collect()
}

/// Fit free bytes against elapsed days.
///
/// Two samples use the secant slope directly; more use least squares.
/// Returns `None` with fewer than two samples or when all timestamps coincide.
pub fn fit(samples: &[Snapshot]) -> Option<LinearFit> {
    let first = samples.first()?;
    if samples.len() < 2 {
        return None;
    }

    let base = first.free_bytes as f64;
    let xs = elapsed_days(samples);
    let ys = relative_free(samples);

    if samples.len() == 2 {
        let dx = xs[1] - xs[0];
        if dx <= 0.0 {
            return None;
        }
        return Some(LinearFit {
            slope: ys[1] / dx,
            intercept: base,
            r_squared: 1.0,
        });
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }

    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = r_squared(&xs, &ys, slope, intercept);

    Some(LinearFit {
        slope,
        intercept: intercept + base,
        r_squared,
    })
}

/// Coefficient of determination; 0 when free space never changed
fn r_squared(xs: &[f64], ys: &[f64], slope: f64, intercept: f64) -> f64 {
    let mean_y = ys.iter().sum::<f64>() / ys.len() as f64;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let predicted = slope * x + intercept;
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }

    if ss_tot == 0.0 {
        return 0.0;
    }

    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn series(points: &[(i64, u64)]) -> Vec<Snapshot> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        points
            .iter()
            .map(|(hours, free)| {
                Snapshot::new(start + Duration::hours(*hours), *free, 1_000_000).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_insufficient_samples() {
        assert!(fit(&[]).is_none());
        assert!(fit(&series(&[(0, 500)])).is_none());
    }

    #[test]
    fn test_two_point_secant() {
        let fit = fit(&series(&[(0, 100_000), (12, 90_000)])).unwrap();
        // 10_000 bytes lost over half a day
        assert!((fit.slope + 20_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_matches_secant() {
        let many = fit(&series(&[(0, 1_000), (6, 900), (12, 800), (18, 700), (24, 600)])).unwrap();
        let two = fit(&series(&[(0, 1_000), (24, 600)])).unwrap();
        assert!((many.slope - two.slope).abs() < 1e-6);
        assert!((many.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series() {
        let fit = fit(&series(&[(0, 500), (1, 500), (2, 500)])).unwrap();
        assert!(fit.slope.abs() < 1e-9);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn test_noisy_series_fits_downward() {
        let fit = fit(&series(&[(0, 1_000), (24, 950), (48, 960), (72, 880), (96, 850)])).unwrap();
        assert!(fit.slope < 0.0);
        assert!(fit.r_squared > 0.8 && fit.r_squared <= 1.0);
    }

    const TB: u64 = 1_000_000_000_000;

    /// `count` snapshots every 30s plus up to 6s of deterministic jitter
    fn polled(count: usize, free_at: impl Fn(usize) -> u64) -> Vec<Snapshot> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let at: DateTime<Utc> =
                    start + Duration::seconds(30 * i as i64 + (i % 7) as i64);
                Snapshot::new(at, free_at(i), TB).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_flat_disk_at_polling_cadence_has_zero_slope() {
        let samples = polled(2880, |_| 123_456_789_012);
        let fit = fit(&samples).unwrap();

        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 0.0);
        assert_eq!(fit.intercept, 123_456_789_012.0);
    }

    #[test]
    fn test_collinear_matches_secant_at_scale() {
        // 37s spacing is not a whole fraction of a day
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let samples: Vec<Snapshot> = (0..4000u64)
            .map(|i| {
                let at = start + Duration::seconds(37 * i as i64);
                Snapshot::new(at, 480_000_000_000 - 25_000 * i, TB).unwrap()
            })
            .collect();

        let many = fit(&samples).unwrap();
        let two = fit(&[samples[0], samples[samples.len() - 1]]).unwrap();

        let relative = ((many.slope - two.slope) / two.slope).abs();
        assert!(relative < 1e-9, "relative error {relative}");
        assert!((many.r_squared - 1.0).abs() < 1e-9);
        assert!((many.intercept - 480_000_000_000.0).abs() < 1.0);
    }
}
