//! CPU and GPU temperatures from `/sys/class/thermal/thermal_zone*`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::collector::FileSystem;
use crate::collector::probe::{Probe, ProbeError};
use crate::storage::Metric;

/// Logical channel a thermal zone reports for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalChannel {
    Cpu,
    Gpu,
}

/// Zone `type` labels recognized on Raspberry Pi and Jetson boards.
pub const ZONE_CHANNELS: &[(&str, ThermalChannel)] = &[
    ("cpu-thermal", ThermalChannel::Cpu),
    ("gpu-thermal", ThermalChannel::Gpu),
    ("AO-therm", ThermalChannel::Cpu),
    ("GPU-therm", ThermalChannel::Gpu),
];

/// Returns the channel a zone type label maps to, if any.
pub fn channel_for(zone_type: &str) -> Option<ThermalChannel> {
    ZONE_CHANNELS
        .iter()
        .find(|(label, _)| *label == zone_type)
        .map(|(_, channel)| *channel)
}

/// Temperatures in degrees Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Temperatures {
    pub cpu: Metric,
    pub gpu: Metric,
}

/// Reads every thermal zone once per cycle.
///
/// When several zones map to the same channel the last one, in zone index
/// order, wins. A matched zone whose reading fails leaves its channel
/// unavailable without affecting the other one. Only an unreadable thermal
/// directory fails the whole probe.
pub struct ThermalProbe<F: FileSystem> {
    fs: F,
    root: PathBuf,
}

impl<F: FileSystem> ThermalProbe<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `root` - Directory holding `thermal_zone*` entries (usually "/sys/class/thermal")
    pub fn new(fs: F, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Lists `thermal_zone<N>` directories ordered by `N`.
    fn zones(&self) -> Result<Vec<PathBuf>, ProbeError> {
        if !self.fs.exists(&self.root) {
            return Err(ProbeError::Missing(format!(
                "thermal interface {}",
                self.root.display()
            )));
        }

        let mut zones: Vec<(u32, PathBuf)> = self
            .fs
            .read_dir(&self.root)?
            .into_iter()
            .filter_map(|path| {
                let index = zone_index(&path)?;
                Some((index, path))
            })
            .collect();
        zones.sort();
        Ok(zones.into_iter().map(|(_, path)| path).collect())
    }

    fn read_millidegrees(&self, path: &Path) -> Result<f64, ProbeError> {
        let content = self.fs.read_to_string(path)?;
        let raw: i64 = content.trim().parse().map_err(|_| {
            ProbeError::Parse(format!(
                "invalid temperature {:?} in {}",
                content.trim(),
                path.display()
            ))
        })?;
        Ok(raw as f64 / 1000.0)
    }
}

fn zone_index(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("thermal_zone")?
        .parse()
        .ok()
}

#[async_trait]
impl<F: FileSystem> Probe for ThermalProbe<F> {
    type Output = Temperatures;

    fn name(&self) -> &'static str {
        "temperatures"
    }

    async fn read(&self) -> Result<Temperatures, ProbeError> {
        let mut temps = Temperatures::default();

        for zone in self.zones()? {
            let type_path = zone.join("type");
            let temp_path = zone.join("temp");
            if !self.fs.exists(&type_path) || !self.fs.exists(&temp_path) {
                continue;
            }

            let zone_type = match self.fs.read_to_string(&type_path) {
                Ok(zone_type) => zone_type,
                Err(e) => {
                    warn!(zone = %zone.display(), "skipping thermal zone: {}", e);
                    continue;
                }
            };
            let Some(channel) = channel_for(zone_type.trim()) else {
                continue;
            };

            // A zone that cannot be read only costs its own channel.
            let celsius = match self.read_millidegrees(&temp_path) {
                Ok(value) => Metric::new(value),
                Err(e) => {
                    warn!(zone = %zone.display(), "{:?} temperature unavailable: {}", channel, e);
                    Metric::unavailable()
                }
            };
            match channel {
                ThermalChannel::Cpu => temps.cpu = celsius,
                ThermalChannel::Gpu => temps.gpu = celsius,
            }
        }

        Ok(temps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn probe(fs: MockFs) -> ThermalProbe<MockFs> {
        ThermalProbe::new(fs, "/sys/class/thermal")
    }

    #[tokio::test]
    async fn test_known_zones_map_to_channels() {
        let mut fs = MockFs::new();
        fs.add_thermal_zone(0, "cpu-thermal", "45123");
        fs.add_thermal_zone(1, "gpu-thermal", "41000");

        let temps = probe(fs).read().await.unwrap();
        assert_eq!(temps.cpu.value(), Some(45.12));
        assert_eq!(temps.gpu.value(), Some(41.0));
    }

    #[tokio::test]
    async fn test_unknown_zone_is_ignored() {
        let mut fs = MockFs::new();
        fs.add_thermal_zone(0, "cpu-thermal", "50000");
        fs.add_thermal_zone(1, "PMIC-Die", "100000");
        fs.add_thermal_zone(2, "thermal-fan-est", "not-a-number");

        let temps = probe(fs).read().await.unwrap();
        assert_eq!(temps.cpu.value(), Some(50.0));
        assert!(!temps.gpu.is_available());
    }

    #[tokio::test]
    async fn test_last_matching_zone_wins() {
        let mut fs = MockFs::new();
        fs.add_thermal_zone(2, "AO-therm", "39500");
        fs.add_thermal_zone(10, "cpu-thermal", "47000");
        fs.add_thermal_zone(1, "GPU-therm", "38000");

        let temps = probe(fs).read().await.unwrap();
        // zone10 sorts after zone2 numerically
        assert_eq!(temps.cpu.value(), Some(47.0));
        assert_eq!(temps.gpu.value(), Some(38.0));
    }

    #[tokio::test]
    async fn test_zone_without_temp_is_skipped() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/thermal/thermal_zone0/type", "cpu-thermal\n");
        fs.add_file("/sys/class/thermal/cooling_device0/type", "Processor\n");

        let temps = probe(fs).read().await.unwrap();
        assert!(!temps.cpu.is_available());
        assert!(!temps.gpu.is_available());
    }

    #[tokio::test]
    async fn test_missing_interface() {
        let err = probe(MockFs::new()).read().await.unwrap_err();
        assert!(matches!(err, ProbeError::Missing(_)));
    }

    #[tokio::test]
    async fn test_bad_reading_only_drops_its_channel() {
        let mut fs = MockFs::new();
        fs.add_thermal_zone(0, "cpu-thermal", "45000");
        fs.add_thermal_zone(1, "gpu-thermal", "garbage");

        let temps = probe(fs).read().await.unwrap();
        assert_eq!(temps.cpu.value(), Some(45.0));
        assert!(!temps.gpu.is_available());
    }

    #[tokio::test]
    async fn test_power_gated_gpu_zone_keeps_cpu() {
        // Jetson GPU-therm/temp reads empty while the GPU is power-gated.
        let mut fs = MockFs::new();
        fs.add_thermal_zone(0, "GPU-therm", "");
        fs.add_thermal_zone(1, "AO-therm", "38500");

        let temps = probe(fs).read().await.unwrap();
        assert_eq!(temps.cpu.value(), Some(38.5));
        assert!(!temps.gpu.is_available());
    }

    #[tokio::test]
    async fn test_failing_later_zone_overrides_earlier_match() {
        let mut fs = MockFs::new();
        fs.add_thermal_zone(0, "cpu-thermal", "45000");
        fs.add_thermal_zone(1, "AO-therm", "n/a");
        fs.add_thermal_zone(2, "gpu-thermal", "41000");

        let temps = probe(fs).read().await.unwrap();
        assert!(!temps.cpu.is_available());
        assert_eq!(temps.gpu.value(), Some(41.0));
    }

    #[test]
    fn test_channel_for() {
        assert_eq!(channel_for("AO-therm"), Some(ThermalChannel::Cpu));
        assert_eq!(channel_for("GPU-therm"), Some(ThermalChannel::Gpu));
        assert_eq!(channel_for("CPU-therm"), None);
    }
}
