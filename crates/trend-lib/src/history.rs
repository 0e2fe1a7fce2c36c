//! Bounded snapshot history for one volume
//!
//! Snapshots are kept oldest first with strictly increasing timestamps.
//! Every append evicts entries that fall outside the retention policy:
//! - older than `max_age` relative to the newest snapshot
//! - beyond `max_entries` (FIFO)

use crate::error::TrendError;
use crate::models::Snapshot;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Default retention period (24 hours)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum entries (24 hours at the default 30s poll interval)
pub const DEFAULT_MAX_ENTRIES: usize = 2880;

/// Retention bounds for a history buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    pub max_entries: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_RETENTION,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Time-ordered, bounded buffer of snapshots
#[derive(Debug, Clone)]
pub struct History {
    buffer: VecDeque<Snapshot>,
    policy: RetentionPolicy,
}

impl History {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            buffer: VecDeque::with_capacity(policy.max_entries.min(4096)),
            policy,
        }
    }

    /// Append a snapshot and evict whatever falls outside retention.
    ///
    /// A snapshot not strictly newer than the latest one is rejected and the
    /// buffer is left untouched.
    pub fn append(&mut self, snapshot: Snapshot) -> Result<(), TrendError> {
        if let Some(latest) = self.buffer.back() {
            if snapshot.timestamp <= latest.timestamp {
                return Err(TrendError::OutOfOrderSample {
                    latest: latest.timestamp,
                    attempted: snapshot.timestamp,
                });
            }
        }

        self.buffer.push_back(snapshot);
        self.evict();
        Ok(())
    }

    /// Current contents, oldest first
    pub fn recent(&self) -> Vec<Snapshot> {
        self.buffer.iter().copied().collect()
    }

    /// Snapshots no older than `window` before the newest one, oldest first
    pub fn within(&self, window: Duration) -> Vec<Snapshot> {
        let Some(latest) = self.buffer.back() else {
            return Vec::new();
        };
        let Ok(window) = chrono::Duration::from_std(window) else {
            return self.recent();
        };
        let Some(cutoff) = latest.timestamp.checked_sub_signed(window) else {
            return self.recent();
        };

        self.buffer
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .copied()
            .collect()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.buffer.back().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> + ExactSizeIterator {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    fn evict(&mut self) {
        let before = self.buffer.len();

        if let Some(latest) = self.buffer.back().map(|s| s.timestamp) {
            if let Some(cutoff) = chrono::Duration::from_std(self.policy.max_age)
                .ok()
                .and_then(|age| latest.checked_sub_signed(age))
            {
                while let Some(front) = self.buffer.front() {
                    if front.timestamp < cutoff {
                        self.buffer.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }

        let max_entries = self.policy.max_entries.max(1);
        while self.buffer.len() > max_entries {
            self.buffer.pop_front();
        }

        let evicted = before - self.buffer.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.buffer.len(), "Evicted expired snapshots");
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}
