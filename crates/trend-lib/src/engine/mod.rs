//! Per-volume trend engine
//!
//! Owns one bounded history per mounted volume, keyed by mount point. Each
//! map shard is guarded by a reader/writer lock, so a single sampler can
//! write while any number of readers compute trends and forecasts.


use crate::error::TrendError;
use crate::history::{History, RetentionPolicy};
use crate::models::{Snapshot, VolumeInfo};
use crate::status::{Thresholds, VolumeStatus};
use crate::trend::{Forecast, Trend};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Default regression window (24 hours)
pub const DEFAULT_TREND_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Engine configuration, passed in explicitly by the host
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub retention: RetentionPolicy,
    pub thresholds: Thresholds,
    /// Window used by `default_trend` and `forecast`
    pub trend_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::default(),
            thresholds: Thresholds::default(),
            trend_window: DEFAULT_TREND_WINDOW,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), TrendError> {
        self.thresholds.validate()?;

        if self.trend_window.is_zero() {
            return Err(TrendError::InvalidConfig(
                "trend window must be positive".to_string(),
            ));
        }
        if self.retention.max_age.is_zero() {
            return Err(TrendError::InvalidConfig(
                "retention period must be positive".to_string(),
            ));
        }
        if self.retention.max_entries < 2 {
            return Err(TrendError::InvalidConfig(format!(
                "retention must keep at least 2 snapshots, got {}",
                self.retention.max_entries
            )));
        }
        Ok(())
    }
}

/// A change of classification produced by `TrendEngine::record`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// `None` for the first snapshot of a volume
    pub previous: Option<VolumeStatus>,
    pub current: VolumeStatus,
}

impl StatusChange {
    pub fn is_worse(&self) -> bool {
        self.previous.map_or(false, |prev| self.current > prev)
    }
}

#[derive(Debug)]
struct VolumeState {
    info: VolumeInfo,
    history: History,
}

/// Tracks histories for a set of volumes and answers trend queries
#[derive(Debug)]
pub struct TrendEngine {
    volumes: DashMap<String, VolumeState>,
    config: EngineConfig,
}

impl TrendEngine {
    pub fn new(config: EngineConfig) -> Result<Self, TrendError> {
        config.validate()?;
        Ok(Self {
            volumes: DashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record the capacity of `info` measured at `at`.
    ///
    /// Returns the status change, if any. Invalid or out-of-order snapshots
    /// leave the volume's history and metadata untouched.
    pub fn record(
        &self,
        info: &VolumeInfo,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, TrendError> {
        let snapshot = info.snapshot_at(at)?;

        let mut state = self
            .volumes
            .entry(info.mount_point.clone())
            .or_insert_with(|| {
                debug!(mount_point = %info.mount_point, "Tracking new volume");
                VolumeState {
                    info: info.clone(),
                    history: History::new(self.config.retention),
                }
            });

        let previous = state.history.latest().map(|s| self.classify(&s));
        state.history.append(snapshot)?;
        state.info = info.clone();

        let current = self.classify(&snapshot);
        if previous == Some(current) {
            return Ok(None);
        }
        Ok(Some(StatusChange { previous, current }))
    }

    /// Classification of the latest snapshot, `None` for unknown volumes
    pub fn status(&self, mount_point: &str) -> Option<VolumeStatus> {
        self.latest(mount_point).map(|s| self.classify(&s))
    }

    /// Trend over snapshots within `window` of the newest one
    pub fn trend(&self, mount_point: &str, window: Duration) -> Option<Trend> {
        let samples = self.volumes.get(mount_point)?.history.within(window);
        Trend::compute(&samples)
    }

    /// Trend over the configured window
    pub fn default_trend(&self, mount_point: &str) -> Option<Trend> {
        self.trend(mount_point, self.config.trend_window)
    }

    /// Fresh forecast from the configured trend; empty without a trend
    pub fn forecast(&self, mount_point: &str) -> Forecast {
        self.default_trend(mount_point)
            .map(|t| t.forecast())
            .unwrap_or_else(Forecast::empty)
    }

    pub fn latest(&self, mount_point: &str) -> Option<Snapshot> {
        self.volumes.get(mount_point)?.history.latest()
    }

    pub fn recent(&self, mount_point: &str) -> Vec<Snapshot> {
        self.volumes
            .get(mount_point)
            .map(|state| state.history.recent())
            .unwrap_or_default()
    }

    /// Tracked volumes: root first, then internal before external, then by name
    pub fn volumes(&self) -> Vec<VolumeInfo> {
        let mut list: Vec<VolumeInfo> = self.volumes.iter().map(|r| r.info.clone()).collect();
        list.sort_by(|a, b| {
            b.is_root()
                .cmp(&a.is_root())
                .then_with(|| b.is_internal.cmp(&a.is_internal))
                .then_with(|| a.name.cmp(&b.name))
        });
        list
    }

    pub fn primary_volume(&self) -> Option<VolumeInfo> {
        self.volumes
            .get(crate::models::ROOT_MOUNT)
            .map(|state| state.info.clone())
    }

    /// Stop tracking a volume, dropping its history
    pub fn remove(&self, mount_point: &str) -> Option<VolumeInfo> {
        debug!(mount_point = %mount_point, "Dropping volume history");
        self.volumes.remove(mount_point).map(|(_, state)| state.info)
    }

    /// Drop every volume whose mount point is not in `mounted`, returning
    /// the dropped volumes
    pub fn retain_mounted(&self, mounted: &HashSet<&str>) -> Vec<VolumeInfo> {
        let gone: Vec<String> = self
            .volumes
            .iter()
            .filter(|entry| !mounted.contains(entry.key().as_str()))
            .map(|entry| entry.key().clone())
            .collect();

        gone.iter().filter_map(|mp| self.remove(mp)).collect()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    fn classify(&self, snapshot: &Snapshot) -> VolumeStatus {
        VolumeStatus::classify(snapshot.free_percentage(), &self.config.thresholds)
    }
}
