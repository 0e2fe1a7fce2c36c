//! Disk capacity trend engine
//!
//! This crate provides the core functionality for:
//! - Bounded per-volume snapshot histories
//! - Free-space trends via linear regression and time-to-full projection
//! - Daily free-space forecasts and status classification
//! - Periodic sampling from a pluggable volume source
//! - Metrics and structured logging

pub mod engine;
pub mod error;
pub mod history;
pub mod models;
pub mod observability;
pub mod sampler;
pub mod status;
pub mod trend;

pub use engine::{EngineConfig, StatusChange, TrendEngine};
pub use error::TrendError;
pub use history::{History, RetentionPolicy};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use status::{Thresholds, VolumeStatus};
pub use trend::{Forecast, ForecastOutlook, ForecastPoint, Trend, TrendDirection};
