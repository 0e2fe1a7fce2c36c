//! Observability infrastructure for the trend engine
//!
//! Provides:
//! - Prometheus metrics (sample latency, recorded snapshots, rejections, free bytes)
//! - Structured logging of domain events with tracing

use crate::engine::StatusChange;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, Encoder,
    GaugeVec, Histogram, IntCounter, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for sampling latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    sample_latency_seconds: Histogram,
    snapshots_recorded: IntCounter,
    source_errors: IntCounter,
    out_of_order_rejections: IntCounter,
    invalid_snapshots: IntCounter,
    volumes_tracked: IntGauge,
    volume_free_bytes: GaugeVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            sample_latency_seconds: register_histogram!(
                "disktrend_sample_latency_seconds",
                "Time spent polling the volume source and recording snapshots",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sample_latency_seconds"),

            snapshots_recorded: register_int_counter!(
                "disktrend_snapshots_recorded_total",
                "Total number of snapshots appended to volume histories"
            )
            .expect("Failed to register snapshots_recorded"),

            source_errors: register_int_counter!(
                "disktrend_source_errors_total",
                "Total number of failed volume source polls"
            )
            .expect("Failed to register source_errors"),

            out_of_order_rejections: register_int_counter!(
                "disktrend_out_of_order_rejections_total",
                "Total number of snapshots rejected for non-increasing timestamps"
            )
            .expect("Failed to register out_of_order_rejections"),

            invalid_snapshots: register_int_counter!(
                "disktrend_invalid_snapshots_total",
                "Total number of snapshots rejected for impossible capacity figures"
            )
            .expect("Failed to register invalid_snapshots"),

            volumes_tracked: register_int_gauge!(
                "disktrend_volumes_tracked",
                "Number of volumes with a history"
            )
            .expect("Failed to register volumes_tracked"),

            volume_free_bytes: register_gauge_vec!(
                "disktrend_volume_free_bytes",
                "Free bytes at the latest snapshot",
                &["mount_point"]
            )
            .expect("Failed to register volume_free_bytes"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_sample_latency(&self, duration_secs: f64) {
        self.inner().sample_latency_seconds.observe(duration_secs);
    }

    pub fn inc_snapshots_recorded(&self) {
        self.inner().snapshots_recorded.inc();
    }

    pub fn inc_source_errors(&self) {
        self.inner().source_errors.inc();
    }

    pub fn inc_out_of_order(&self) {
        self.inner().out_of_order_rejections.inc();
    }

    pub fn inc_invalid_snapshots(&self) {
        self.inner().invalid_snapshots.inc();
    }

    pub fn set_volumes_tracked(&self, count: i64) {
        self.inner().volumes_tracked.set(count);
    }

    pub fn set_free_bytes(&self, mount_point: &str, bytes: u64) {
        self.inner()
            .volume_free_bytes
            .with_label_values(&[mount_point])
            .set(bytes as f64);
    }

    /// Forget the free-space gauge of an unmounted volume
    pub fn remove_free_bytes(&self, mount_point: &str) {
        // missing label is fine, the volume may never have recorded
        let _ = self
            .inner()
            .volume_free_bytes
            .remove_label_values(&[mount_point]);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Structured logger for engine events
///
/// Emits a fixed `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "startup",
            host = %self.host,
            version = %version,
            interval_secs = interval_secs,
            "Disk trend agent starting"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            host = %self.host,
            reason = %reason,
            "Disk trend agent shutting down"
        );
    }

    /// Worsening classifications log at warn, recoveries at info
    pub fn log_status_change(&self, mount_point: &str, change: &StatusChange, free_percent: f64) {
        let previous = change.previous.map(|s| s.as_str()).unwrap_or("none");

        if change.previous.is_none() {
            debug!(
                event = "status_initial",
                host = %self.host,
                mount_point = %mount_point,
                status = %change.current,
                free_percent = free_percent,
                "Volume classified"
            );
        } else if change.is_worse() {
            warn!(
                event = "status_changed",
                host = %self.host,
                mount_point = %mount_point,
                previous = %previous,
                status = %change.current,
                free_percent = free_percent,
                "Volume free space worsened"
            );
        } else {
            info!(
                event = "status_changed",
                host = %self.host,
                mount_point = %mount_point,
                previous = %previous,
                status = %change.current,
                free_percent = free_percent,
                "Volume free space recovered"
            );
        }
    }

    pub fn log_volume_removed(&self, mount_point: &str, name: &str) {
        info!(
            event = "volume_removed",
            host = %self.host,
            mount_point = %mount_point,
            name = %name,
            "Volume no longer mounted, dropped its history"
        );
    }

    pub fn log_out_of_order(&self, mount_point: &str, details: &str) {
        warn!(
            event = "out_of_order_sample",
            host = %self.host,
            mount_point = %mount_point,
            details = %details,
            "Rejected out-of-order snapshot"
        );
    }
}
