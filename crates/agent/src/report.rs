//! Periodic per-volume report
//!
//! Logs status, trend and forecast for every tracked volume as one JSON
//! object per line.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use trend_lib::{ForecastOutlook, ForecastPoint, TrendDirection, TrendEngine, VolumeStatus};

#[derive(Debug, Clone, Serialize)]
pub struct VolumeReport {
    pub mount_point: String,
    pub name: String,
    pub status: Option<VolumeStatus>,
    pub free_percent: f64,
    pub data_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_per_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<TrendDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_full: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlook: Option<ForecastOutlook>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_end: Option<ForecastPoint>,
}

pub fn build_reports(engine: &TrendEngine) -> Vec<VolumeReport> {
    engine
        .volumes()
        .into_iter()
        .map(|volume| {
            let trend = engine.default_trend(&volume.mount_point);
            VolumeReport {
                status: engine.status(&volume.mount_point),
                free_percent: volume.free_percentage(),
                data_points: engine.recent(&volume.mount_point).len(),
                bytes_per_day: trend.map(|t| t.bytes_per_day),
                direction: trend.map(|t| t.direction()),
                days_until_full: trend.and_then(|t| t.days_until_full),
                outlook: trend.and_then(|t| t.outlook()),
                forecast_end: engine.forecast(&volume.mount_point).last(),
                mount_point: volume.mount_point,
                name: volume.name,
            }
        })
        .collect()
}

pub fn log_reports(engine: &TrendEngine) {
    for report in build_reports(engine) {
        match serde_json::to_string(&report) {
            Ok(json) => info!(
                event = "volume_report",
                mount_point = %report.mount_point,
                report = %json,
                "Volume report"
            ),
            Err(e) => warn!(error = %e, "Failed to serialize volume report"),
        }
    }
}

/// Log reports every `every` until shutdown
pub async fn run(
    engine: Arc<TrendEngine>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick fires immediately, before any sample exists
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => log_reports(&engine),
            _ = shutdown.recv() => break,
        }
    }
}
