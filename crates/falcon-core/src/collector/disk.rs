//! Root filesystem usage.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::collector::FileSystem;
use crate::collector::probe::{Probe, ProbeError};
use crate::fmt::round2;

/// Share of the filesystem mounted at `mount_point` that is in use, out of
/// the space unprivileged processes can use.
pub struct DiskUsageProbe<F: FileSystem> {
    fs: F,
    mount_point: PathBuf,
}

impl<F: FileSystem> DiskUsageProbe<F> {
    pub fn new(fs: F, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            mount_point: mount_point.into(),
        }
    }
}

#[async_trait]
impl<F: FileSystem> Probe for DiskUsageProbe<F> {
    type Output = f64;

    fn name(&self) -> &'static str {
        "disk usage"
    }

    async fn read(&self) -> Result<f64, ProbeError> {
        let space = self.fs.disk_usage(&self.mount_point)?;
        // Same figure as df's Use%: blocks reserved for root count as neither
        // used nor available.
        let used = space.total.saturating_sub(space.free);
        let usable = used + space.available;
        if usable == 0 {
            return Err(ProbeError::Parse(format!(
                "filesystem at {} reports zero capacity",
                self.mount_point.display()
            )));
        }
        Ok(round2(used as f64 / usable as f64 * 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[tokio::test]
    async fn test_disk_usage() {
        let mut fs = MockFs::new();
        fs.add_mount("/", 1_000_000, 287_500, 287_500);

        let probe = DiskUsageProbe::new(fs, "/");
        assert_eq!(probe.read().await.unwrap(), 71.25);
    }

    #[tokio::test]
    async fn test_reserved_blocks_are_not_counted_as_used() {
        // 1000 blocks, 150 free of which 50 are reserved for root.
        let mut fs = MockFs::new();
        fs.add_mount("/", 1000, 150, 100);

        let probe = DiskUsageProbe::new(fs, "/");
        // used 850 of 950 usable
        assert_eq!(probe.read().await.unwrap(), 89.47);
    }

    #[tokio::test]
    async fn test_disk_usage_unknown_mount() {
        let probe = DiskUsageProbe::new(MockFs::new(), "/");
        assert!(matches!(probe.read().await, Err(ProbeError::Io(_))));
    }

    #[tokio::test]
    async fn test_disk_usage_zero_capacity() {
        let mut fs = MockFs::new();
        fs.add_mount("/", 0, 0, 0);

        let probe = DiskUsageProbe::new(fs, "/");
        assert!(matches!(probe.read().await, Err(ProbeError::Parse(_))));
    }
}
