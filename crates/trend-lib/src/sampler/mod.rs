//! Volume sampling
//!
//! A `VolumeSource` reports the mounted volumes and their capacity. The
//! sampler polls it on a fixed interval and feeds the trend engine; the
//! engine itself holds no timer state.

mod r#loop;
mod statvfs;

pub use r#loop::{SampleReport, Sampler, SamplerBuilder, SamplerConfig, DEFAULT_POLL_INTERVAL};
pub use statvfs::{StatvfsSource, DEFAULT_MOUNTS_PATH};

use crate::error::TrendError;
use crate::models::VolumeInfo;

pub use async_trait::async_trait;

/// Source of current volume capacity figures
#[async_trait]
pub trait VolumeSource: Send + Sync {
    /// List currently mounted volumes.
    ///
    /// May return an empty list. Failure means no snapshot this cycle.
    async fn volumes(&self) -> Result<Vec<VolumeInfo>, TrendError>;
}
