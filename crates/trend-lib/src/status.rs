//! Volume status classification from current free percentage

use crate::error::TrendError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAUTION_PERCENT: f64 = 20.0;
pub const DEFAULT_WARNING_PERCENT: f64 = 10.0;
pub const DEFAULT_CRITICAL_PERCENT: f64 = 5.0;

/// Free-space classification of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeStatus {
    Healthy,
    Caution,
    Warning,
    Critical,
}

impl VolumeStatus {
    /// Classify a free percentage against the given thresholds
    pub fn classify(free_percent: f64, thresholds: &Thresholds) -> Self {
        if free_percent < thresholds.critical_percent {
            VolumeStatus::Critical
        } else if free_percent < thresholds.warning_percent {
            VolumeStatus::Warning
        } else if free_percent < thresholds.caution_percent {
            VolumeStatus::Caution
        } else {
            VolumeStatus::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeStatus::Healthy => "healthy",
            VolumeStatus::Caution => "caution",
            VolumeStatus::Warning => "warning",
            VolumeStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-percentage boundaries; each status applies below its threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub caution_percent: f64,
    pub warning_percent: f64,
    pub critical_percent: f64,
}

impl Thresholds {
    /// Requires `0 < critical < warning < caution <= 100`
    pub fn validate(&self) -> Result<(), TrendError> {
        let ordered = 0.0 < self.critical_percent
            && self.critical_percent < self.warning_percent
            && self.warning_percent < self.caution_percent
            && self.caution_percent <= 100.0;

        if !ordered {
            return Err(TrendError::InvalidConfig(format!(
                "thresholds must satisfy 0 < critical ({}) < warning ({}) < caution ({}) <= 100",
                self.critical_percent, self.warning_percent, self.caution_percent
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            caution_percent: DEFAULT_CAUTION_PERCENT,
            warning_percent: DEFAULT_WARNING_PERCENT,
            critical_percent: DEFAULT_CRITICAL_PERCENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classification() {
        let t = Thresholds::default();
        assert_eq!(VolumeStatus::classify(50.0, &t), VolumeStatus::Healthy);
        assert_eq!(VolumeStatus::classify(15.0, &t), VolumeStatus::Caution);
        assert_eq!(VolumeStatus::classify(7.5, &t), VolumeStatus::Warning);
        assert_eq!(VolumeStatus::classify(3.0, &t), VolumeStatus::Critical);
    }

    #[test]
    fn test_boundaries() {
        let t = Thresholds::default();
        assert_eq!(VolumeStatus::classify(20.0, &t), VolumeStatus::Healthy);
        assert_eq!(VolumeStatus::classify(10.0, &t), VolumeStatus::Caution);
        assert_eq!(VolumeStatus::classify(5.0, &t), VolumeStatus::Warning);
        assert_eq!(VolumeStatus::classify(0.0, &t), VolumeStatus::Critical);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = Thresholds {
            caution_percent: 30.0,
            warning_percent: 15.0,
            critical_percent: 2.0,
        };
        assert!(t.validate().is_ok());
        assert_eq!(VolumeStatus::classify(25.0, &t), VolumeStatus::Caution);
        assert_eq!(VolumeStatus::classify(3.0, &t), VolumeStatus::Warning);
    }

    #[test]
    fn test_invalid_thresholds() {
        let t = Thresholds {
            caution_percent: 20.0,
            warning_percent: 5.0,
            critical_percent: 10.0,
        };
        assert!(matches!(t.validate(), Err(TrendError::InvalidConfig(_))));
        assert!(Thresholds::default().validate().is_ok());
    }

    #[test]
    fn test_status_ordering_and_serde() {
        assert!(VolumeStatus::Critical > VolumeStatus::Caution);
        let json = serde_json::to_string(&VolumeStatus::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
