//! Error taxonomy for the trend engine
//!
//! Missing trends and forecasts are not errors: they surface as `None` or an
//! empty forecast. Only conditions a caller may want to log or count are here.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrendError {
    /// The volume-info source failed for this cycle
    #[error("volume source unavailable: {0}")]
    SourceUnavailable(String),

    /// A snapshot was not newer than the latest stored one
    #[error("out-of-order sample: {attempted} is not after latest {latest}")]
    OutOfOrderSample {
        latest: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    /// The source reported impossible capacity figures
    #[error("invalid snapshot: free {free_bytes} bytes of total {total_bytes} bytes")]
    InvalidSnapshot { free_bytes: u64, total_bytes: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
