//! GPU utilization from the devfreq/nvgpu `load` interface.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::collector::FileSystem;
use crate::collector::probe::{Probe, ProbeError};
use crate::fmt::round2;

/// Known GPU load files, in probing order (Jetson nvgpu, then devfreq).
pub const DEFAULT_GPU_LOAD_PATHS: &[&str] = &[
    "/sys/devices/gpu.0/load",
    "/sys/class/devfreq/17000000.gpu/load",
];

/// Reads the first GPU load file that exists.
///
/// The file holds load in tenths of a percent. Once a path exists it is the
/// only one read: if it cannot be parsed the reading fails outright.
pub struct GpuLoadProbe<F: FileSystem> {
    fs: F,
    paths: Vec<PathBuf>,
}

impl<F: FileSystem> GpuLoadProbe<F> {
    pub fn new(fs: F, paths: Vec<PathBuf>) -> Self {
        Self { fs, paths }
    }
}

#[async_trait]
impl<F: FileSystem> Probe for GpuLoadProbe<F> {
    type Output = f64;

    fn name(&self) -> &'static str {
        "gpu usage"
    }

    async fn read(&self) -> Result<f64, ProbeError> {
        let Some(path) = self.paths.iter().find(|p| self.fs.exists(p)) else {
            return Err(ProbeError::Missing("GPU load interface".to_string()));
        };

        let content = self.fs.read_to_string(path)?;
        let raw: i64 = content.trim().parse().map_err(|_| {
            ProbeError::Parse(format!(
                "invalid GPU load {:?} in {}",
                content.trim(),
                path.display()
            ))
        })?;
        Ok(round2(raw as f64 / 10.0))
    }
}
