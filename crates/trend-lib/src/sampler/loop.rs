//! Sampling loop
//!
//! Polls the volume source at a fixed interval (plus jitter) and records one
//! snapshot per volume into the trend engine. Volumes missing from a
//! successful poll are dropped. A failed poll leaves every history
//! untouched; the next tick simply tries again.

use super::VolumeSource;
use crate::engine::TrendEngine;
use crate::error::TrendError;
use crate::observability::{EngineMetrics, StructuredLogger};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default poll interval (30 seconds)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the sampling loop
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub interval: Duration,
    /// Maximum random delay added to each interval
    pub jitter: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            jitter: Duration::ZERO,
        }
    }
}

/// Outcome of a single poll
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SampleReport {
    pub recorded: usize,
    pub rejected: usize,
    /// Volumes dropped because the source no longer reports them
    pub removed: usize,
    pub source_failed: bool,
}

/// Drives periodic sampling into a `TrendEngine`
pub struct Sampler {
    source: Arc<dyn VolumeSource>,
    engine: Arc<TrendEngine>,
    config: SamplerConfig,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl Sampler {
    pub fn new(
        source: Arc<dyn VolumeSource>,
        engine: Arc<TrendEngine>,
        config: SamplerConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            source,
            engine,
            config,
            metrics: EngineMetrics::new(),
            logger,
        }
    }

    pub fn engine(&self) -> &Arc<TrendEngine> {
        &self.engine
    }

    /// Run until a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting volume sampling loop"
        );

        let mut ticker = interval(self.current_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sample().await;
                    cycles += 1;

                    if cycles % 10 == 0 {
                        debug!(
                            cycles,
                            volumes = self.engine.len(),
                            recorded = report.recorded,
                            rejected = report.rejected,
                            "Sampling cycle complete"
                        );
                    }

                    if !self.config.jitter.is_zero() {
                        ticker = interval(self.current_interval());
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        ticker.tick().await;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Stopping volume sampling loop");
                    break;
                }
            }
        }
    }

    /// Poll once, stamping snapshots with the current time
    pub async fn sample(&self) -> SampleReport {
        self.sample_at(Utc::now()).await
    }

    /// Poll once, stamping every snapshot with `now`
    pub async fn sample_at(&self, now: DateTime<Utc>) -> SampleReport {
        let start = Instant::now();
        let mut report = SampleReport::default();

        let volumes = match self.source.volumes().await {
            Ok(volumes) => volumes,
            Err(e) => {
                warn!(error = %e, "Volume source poll failed, skipping cycle");
                self.metrics.inc_source_errors();
                report.source_failed = true;
                return report;
            }
        };

        for volume in &volumes {
            match self.engine.record(volume, now) {
                Ok(change) => {
                    report.recorded += 1;
                    self.metrics.inc_snapshots_recorded();
                    self.metrics
                        .set_free_bytes(&volume.mount_point, volume.free_bytes);
                    if let Some(change) = change {
                        self.logger.log_status_change(
                            &volume.mount_point,
                            &change,
                            volume.free_percentage(),
                        );
                    }
                }
                Err(e @ TrendError::OutOfOrderSample { .. }) => {
                    report.rejected += 1;
                    self.metrics.inc_out_of_order();
                    self.logger
                        .log_out_of_order(&volume.mount_point, &e.to_string());
                }
                Err(e) => {
                    report.rejected += 1;
                    self.metrics.inc_invalid_snapshots();
                    warn!(
                        mount_point = %volume.mount_point,
                        error = %e,
                        "Rejected snapshot"
                    );
                }
            }
        }

        let mounted: HashSet<&str> = volumes.iter().map(|v| v.mount_point.as_str()).collect();
        for gone in self.engine.retain_mounted(&mounted) {
            report.removed += 1;
            self.metrics.remove_free_bytes(&gone.mount_point);
            self.logger.log_volume_removed(&gone.mount_point, &gone.name);
        }

        self.metrics.set_volumes_tracked(self.engine.len() as i64);
        self.metrics
            .observe_sample_latency(start.elapsed().as_secs_f64());
        report
    }

    fn current_interval(&self) -> Duration {
        let jitter_ms = rand_jitter(self.config.jitter.as_millis() as u64);
        self.config.interval + Duration::from_millis(jitter_ms)
    }
}

/// Pseudo-random jitter in `0..max_ms` derived from the clock
fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    now % max_ms
}

/// Builder for the sampling loop
pub struct SamplerBuilder {
    source: Option<Arc<dyn VolumeSource>>,
    engine: Option<Arc<TrendEngine>>,
    config: SamplerConfig,
    host: String,
}

impl SamplerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            engine: None,
            config: SamplerConfig::default(),
            host: "localhost".to_string(),
        }
    }

    pub fn source(mut self, source: Arc<dyn VolumeSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn engine(mut self, engine: Arc<TrendEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Host name attached to structured log events
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn build(self) -> Result<Sampler> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Volume source is required"))?;
        let engine = self
            .engine
            .ok_or_else(|| anyhow::anyhow!("Trend engine is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Poll interval must be positive");
        }

        Ok(Sampler::new(
            source,
            engine,
            self.config,
            StructuredLogger::new(self.host),
        ))
    }
}

impl Default for SamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::models::VolumeInfo;
    use async_trait::async_trait;

    struct FixedSource;

    #[async_trait]
    impl VolumeSource for FixedSource {
        async fn volumes(&self) -> Result<Vec<VolumeInfo>, TrendError> {
            Ok(vec![VolumeInfo {
                name: "root".to_string(),
                mount_point: "/".to_string(),
                total_bytes: 1_000,
                free_bytes: 500,
                is_removable: false,
                is_internal: true,
            }])
        }
    }

    fn engine() -> Arc<TrendEngine> {
        Arc::new(TrendEngine::new(EngineConfig::default()).unwrap())
    }

    #[test]
    fn test_sampler_config_default() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.jitter, Duration::ZERO);
    }

    #[test]
    fn test_rand_jitter() {
        assert!(rand_jitter(1000) < 1000);
        assert_eq!(rand_jitter(0), 0);
    }

    #[test]
    fn test_builder_requires_source() {
        let result = SamplerBuilder::new().engine(engine()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = SamplerBuilder::new()
            .source(Arc::new(FixedSource))
            .engine(engine())
            .interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let engine = engine();
        let sampler = SamplerBuilder::new()
            .source(Arc::new(FixedSource))
            .engine(engine.clone())
            .interval(Duration::from_millis(10))
            .build()
            .unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(sampler.run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(engine.len(), 1);
        assert!(engine.latest("/").is_some());
    }
}
