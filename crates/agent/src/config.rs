//! Agent configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trend_lib::{EngineConfig, RetentionPolicy, Thresholds};

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "DISKTREND_CONFIG";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Host name attached to log events
    #[serde(default = "default_host")]
    pub host: String,

    /// Volume poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum random delay added to each poll, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,

    #[serde(default = "default_caution_threshold")]
    pub caution_threshold_percent: f64,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_percent: f64,

    #[serde(default = "default_critical_threshold")]
    pub critical_threshold_percent: f64,

    /// Regression window in hours
    #[serde(default = "default_trend_window")]
    pub trend_window_hours: u64,

    /// Snapshot retention in hours
    #[serde(default = "default_retention")]
    pub retention_hours: u64,

    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,

    /// Mount table read by the volume source
    #[serde(default = "default_mounts_path")]
    pub mounts_path: PathBuf,

    /// Interval between per-volume report lines in seconds
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_poll_interval() -> u64 {
    30
}

fn default_caution_threshold() -> f64 {
    20.0
}

fn default_warning_threshold() -> f64 {
    10.0
}

fn default_critical_threshold() -> f64 {
    5.0
}

fn default_trend_window() -> u64 {
    24
}

fn default_retention() -> u64 {
    24
}

fn default_max_snapshots() -> usize {
    2880
}

fn default_mounts_path() -> PathBuf {
    PathBuf::from(trend_lib::sampler::DEFAULT_MOUNTS_PATH)
}

fn default_report_interval() -> u64 {
    300
}

impl AgentConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::from_sources(
            file.as_deref(),
            config::Environment::with_prefix("DISKTREND").try_parsing(true),
        )
    }

    fn from_sources(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(env)
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            retention: RetentionPolicy {
                max_age: hours(self.retention_hours),
                max_entries: self.max_snapshots,
            },
            thresholds: Thresholds {
                caution_percent: self.caution_threshold_percent,
                warning_percent: self.warning_threshold_percent,
                critical_percent: self.critical_threshold_percent,
            },
            trend_window: hours(self.trend_window_hours),
        }
    }
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(60 * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unused_env() -> config::Environment {
        config::Environment::with_prefix("DISKTREND_TEST_UNSET")
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_sources(None, unused_env()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.jitter(), Duration::ZERO);
        assert_eq!(config.report_interval_secs, 300);

        let engine = config.engine_config();
        assert_eq!(engine, EngineConfig::default());
        assert!(engine.validate().is_ok());
    }

    #[test]
    fn test_file_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("disktrend.toml");
        std::fs::write(
            &path,
            "poll_interval_secs = 60\nwarning_threshold_percent = 12.0\ntrend_window_hours = 6\n",
        )
        .unwrap();

        let config = AgentConfig::from_sources(Some(&path), unused_env()).unwrap();
        assert_eq!(config.poll_interval_secs, 60);

        let engine = config.engine_config();
        assert_eq!(engine.thresholds.warning_percent, 12.0);
        assert_eq!(engine.trend_window, Duration::from_secs(6 * 60 * 60));
        assert_eq!(engine.thresholds.critical_percent, 5.0);
    }

    #[test]
    fn test_bad_thresholds_fail_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("disktrend.toml");
        std::fs::write(&path, "critical_threshold_percent = 15.0\n").unwrap();

        let config = AgentConfig::from_sources(Some(&path), unused_env()).unwrap();
        assert!(config.engine_config().validate().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/nonexistent/disktrend.toml");
        assert!(AgentConfig::from_sources(Some(path), unused_env()).is_err());
    }
}
