//! Disk trend agent
//!
//! Polls mounted volumes on a fixed interval, tracks free-space trends per
//! volume and periodically logs status and forecasts.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trend_lib::{
    sampler::{SamplerBuilder, StatvfsSource},
    EngineMetrics, StructuredLogger, TrendEngine,
};

mod config;
mod report;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::AgentConfig::load()?;
    info!(host = %config.host, mounts = %config.mounts_path.display(), "Agent configured");

    let logger = StructuredLogger::new(&config.host);
    logger.log_startup(AGENT_VERSION, config.poll_interval_secs);

    let metrics = EngineMetrics::new();
    let engine = Arc::new(TrendEngine::new(config.engine_config())?);

    let sampler = SamplerBuilder::new()
        .source(Arc::new(StatvfsSource::new(&config.mounts_path)))
        .engine(engine.clone())
        .interval(config.poll_interval())
        .jitter(config.jitter())
        .host(&config.host)
        .build()?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let sampler_handle = tokio::spawn(sampler.run(shutdown_tx.subscribe()));
    let report_handle = tokio::spawn(report::run(
        engine.clone(),
        config.report_interval(),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());

    sampler_handle.await?;
    report_handle.await?;

    report::log_reports(&engine);
    debug!(metrics = %metrics.encode_text(), "Final metrics");

    Ok(())
}
