//! Core data models for the disk trend engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrendError;

/// Mount point treated as the primary volume
pub const ROOT_MOUNT: &str = "/";

/// One mounted volume as reported by a volume source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub name: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub is_removable: bool,
    pub is_internal: bool,
}

impl VolumeInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }

    /// Free space as a percentage of capacity (0 when capacity is unknown)
    pub fn free_percentage(&self) -> f64 {
        percentage(self.free_bytes, self.total_bytes)
    }

    pub fn used_percentage(&self) -> f64 {
        percentage(self.used_bytes(), self.total_bytes)
    }

    pub fn is_root(&self) -> bool {
        self.mount_point == ROOT_MOUNT
    }

    /// Build a snapshot of this volume taken at `timestamp`
    pub fn snapshot_at(&self, timestamp: DateTime<Utc>) -> Result<Snapshot, TrendError> {
        Snapshot::new(timestamp, self.free_bytes, self.total_bytes)
    }
}

/// A single timestamped capacity measurement of one volume
///
/// Deserialization goes through [`Snapshot::new`], so decoded snapshots hold
/// the same capacity invariant as constructed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub free_bytes: u64,
    pub total_bytes: u64,
}

impl Snapshot {
    /// Create a snapshot, rejecting zero capacity and `free > total`
    pub fn new(
        timestamp: DateTime<Utc>,
        free_bytes: u64,
        total_bytes: u64,
    ) -> Result<Self, TrendError> {
        if total_bytes == 0 || free_bytes > total_bytes {
            return Err(TrendError::InvalidSnapshot {
                free_bytes,
                total_bytes,
            });
        }

        Ok(Self {
            timestamp,
            free_bytes,
            total_bytes,
        })
    }

    pub fn free_percentage(&self) -> f64 {
        percentage(self.free_bytes, self.total_bytes)
    }
}

#[derive(Deserialize)]
struct RawSnapshot {
    timestamp: DateTime<Utc>,
    free_bytes: u64,
    total_bytes: u64,
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = TrendError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        Snapshot::new(raw.timestamp, raw.free_bytes, raw.total_bytes)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn volume(free: u64, total: u64) -> VolumeInfo {
        VolumeInfo {
            name: "Macintosh HD".to_string(),
            mount_point: "/".to_string(),
            total_bytes: total,
            free_bytes: free,
            is_removable: false,
            is_internal: true,
        }
    }

    #[test]
    fn test_percentages() {
        let v = volume(25, 100);
        assert_eq!(v.used_bytes(), 75);
        assert!((v.free_percentage() - 25.0).abs() < 1e-9);
        assert!((v.used_percentage() - 75.0).abs() < 1e-9);
        assert!(v.is_root());
    }

    #[test]
    fn test_zero_capacity_percentage() {
        let v = volume(0, 0);
        assert_eq!(v.free_percentage(), 0.0);
        assert_eq!(v.used_percentage(), 0.0);
    }

    #[test]
    fn test_snapshot_rejects_free_above_total() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = Snapshot::new(ts, 101, 100).unwrap_err();
        assert!(matches!(err, TrendError::InvalidSnapshot { .. }));
        assert!(Snapshot::new(ts, 0, 0).is_err());
        assert!(Snapshot::new(ts, 100, 100).is_ok());
    }

    #[test]
    fn test_snapshot_deserialize_checks_capacity() {
        let valid = r#"{"timestamp":"2024-01-01T00:00:00Z","free_bytes":40,"total_bytes":100}"#;
        let snapshot: Snapshot = serde_json::from_str(valid).unwrap();
        assert_eq!(snapshot.free_bytes, 40);

        let err = serde_json::from_str::<Snapshot>(
            r#"{"timestamp":"2024-01-01T00:00:00Z","free_bytes":101,"total_bytes":100}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("101"));

        let zero = r#"{"timestamp":"2024-01-01T00:00:00Z","free_bytes":0,"total_bytes":0}"#;
        assert!(serde_json::from_str::<Snapshot>(zero).is_err());
    }
}
