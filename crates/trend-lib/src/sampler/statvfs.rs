//! Mounted-volume source backed by the mount table and `statvfs`

use super::{async_trait, VolumeSource};
use crate::error::TrendError;
use crate::models::VolumeInfo;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MOUNTS_PATH: &str = "/proc/mounts";

/// Pseudo and virtual filesystems that never hold user data
const SKIP_FS: &[&str] = &[
    "proc", "sysfs", "devpts", "tmpfs", "devtmpfs", "cgroup", "cgroup2", "pstore", "efivarfs",
    "securityfs", "debugfs", "tracefs", "bpf", "hugetlbfs", "mqueue", "fusectl", "configfs",
    "binfmt_misc", "overlay", "nsfs", "rpc_pipefs", "autofs", "squashfs",
];

const SKIP_MOUNT_PREFIX: &[&str] = &["/proc", "/sys", "/dev", "/run/user", "/snap"];

/// Mount points where removable media usually lands
const REMOVABLE_MOUNT_PREFIX: &[&str] = &["/media", "/run/media", "/mnt"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountEntry {
    device: String,
    mount_point: String,
    fs_type: String,
}

/// Reads the mount table and queries each filesystem with `statvfs`
#[derive(Debug, Clone)]
pub struct StatvfsSource {
    mounts_path: PathBuf,
}

impl StatvfsSource {
    pub fn new(mounts_path: impl Into<PathBuf>) -> Self {
        Self {
            mounts_path: mounts_path.into(),
        }
    }

    async fn read_volumes(&self) -> Result<Vec<VolumeInfo>> {
        let content = tokio::fs::read_to_string(&self.mounts_path)
            .await
            .with_context(|| format!("Failed to read {}", self.mounts_path.display()))?;

        let mut volumes = Vec::new();
        for entry in parse_mounts(&content) {
            if !is_data_mount(&entry) {
                continue;
            }
            match stat_volume(&entry) {
                Ok(Some(volume)) => volumes.push(volume),
                Ok(None) => {}
                Err(e) => {
                    debug!(mount_point = %entry.mount_point, error = %e, "Skipping mount");
                }
            }
        }

        Ok(volumes)
    }
}

impl Default for StatvfsSource {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNTS_PATH)
    }
}

#[async_trait]
impl VolumeSource for StatvfsSource {
    async fn volumes(&self) -> Result<Vec<VolumeInfo>, TrendError> {
        self.read_volumes()
            .await
            .map_err(|e| TrendError::SourceUnavailable(format!("{e:#}")))
    }
}

fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                device: unescape(device),
                mount_point: unescape(mount_point),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Decode the octal escapes (`\040` for space) used in the mount table
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_data_mount(entry: &MountEntry) -> bool {
    if SKIP_FS.contains(&entry.fs_type.as_str()) {
        return false;
    }
    if entry.mount_point != "/"
        && SKIP_MOUNT_PREFIX
            .iter()
            .any(|p| entry.mount_point.starts_with(p))
    {
        return false;
    }
    !entry.device.starts_with("/dev/loop")
}

fn stat_volume(entry: &MountEntry) -> Result<Option<VolumeInfo>> {
    use nix::sys::statvfs::statvfs;

    let stat = statvfs(Path::new(&entry.mount_point))
        .with_context(|| format!("statvfs failed for {}", entry.mount_point))?;

    let frsize = stat.fragment_size() as u64;
    let total_bytes = (stat.blocks() as u64).saturating_mul(frsize);
    let free_bytes = (stat.blocks_available() as u64).saturating_mul(frsize);

    if total_bytes == 0 {
        return Ok(None);
    }

    let removable = REMOVABLE_MOUNT_PREFIX
        .iter()
        .any(|p| entry.mount_point.starts_with(p));

    Ok(Some(VolumeInfo {
        name: volume_name(entry),
        mount_point: entry.mount_point.clone(),
        total_bytes,
        free_bytes: free_bytes.min(total_bytes),
        is_removable: removable,
        is_internal: !removable,
    }))
}

/// Last mount point component, or the short device name for the root volume
fn volume_name(entry: &MountEntry) -> String {
    match Path::new(&entry.mount_point).file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => entry
            .device
            .trim_start_matches("/dev/")
            .trim_start_matches("mapper/")
            .to_string(),
    }
}
