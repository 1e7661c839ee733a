//! CPU and memory utilization from `/proc/stat` and `/proc/meminfo`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::collector::FileSystem;
use crate::collector::probe::{Probe, ProbeError};
use crate::collector::procfs::parser::{CpuTimes, parse_cpu_times, parse_meminfo};
use crate::fmt::round2;

/// CPU busy percentage sampled over a fixed window.
pub struct CpuUsageProbe<F: FileSystem> {
    fs: F,
    stat_path: PathBuf,
    window: Duration,
}

impl<F: FileSystem> CpuUsageProbe<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `window` - Time between the two `/proc/stat` readings
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            fs,
            stat_path: proc_path.into().join("stat"),
            window,
        }
    }

    fn read_times(&self) -> Result<CpuTimes, ProbeError> {
        let content = self.fs.read_to_string(&self.stat_path)?;
        Ok(parse_cpu_times(&content)?)
    }
}

#[async_trait]
impl<F: FileSystem> Probe for CpuUsageProbe<F> {
    type Output = f64;

    fn name(&self) -> &'static str {
        "cpu usage"
    }

    async fn read(&self) -> Result<f64, ProbeError> {
        let before = self.read_times()?;
        tokio::time::sleep(self.window).await;
        let after = self.read_times()?;
        Ok(round2(after.busy_percent_since(&before)))
    }
}

/// Share of physical memory in use.
pub struct MemoryUsageProbe<F: FileSystem> {
    fs: F,
    meminfo_path: PathBuf,
}

impl<F: FileSystem> MemoryUsageProbe<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            meminfo_path: proc_path.into().join("meminfo"),
        }
    }
}

#[async_trait]
impl<F: FileSystem> Probe for MemoryUsageProbe<F> {
    type Output = f64;

    fn name(&self) -> &'static str {
        "memory usage"
    }

    async fn read(&self) -> Result<f64, ProbeError> {
        let content = self.fs.read_to_string(&self.meminfo_path)?;
        let info = parse_meminfo(&content)?;
        Ok(round2(info.used_percent()))
    }
}
