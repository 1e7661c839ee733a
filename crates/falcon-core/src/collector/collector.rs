//! Main collector that runs every probe for one cycle.
//!
//! The `Collector` owns one instance of each metric probe and builds a
//! complete `MetricSample` from them. Probes run one after another; a slow
//! speed test stretches the cycle rather than overlapping with anything.

use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info};

use crate::collector::command::{Liveness, NetworkProbe, Reachability};
use crate::collector::disk::DiskUsageProbe;
use crate::collector::probe::sample;
use crate::collector::procfs::{CpuUsageProbe, MemoryUsageProbe};
use crate::collector::sysfs::{GpuLoadProbe, ThermalProbe};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::config::{Device, MonitorConfig, Section, Settings};
use crate::fmt::format_timestamp;
use crate::storage::{Metric, MetricSample};

/// Separator between status entries.
pub const STATUS_SEPARATOR: &str = " | ";

/// Runs all probes and assembles samples.
pub struct Collector<F: FileSystem + Clone, R: CommandRunner + Clone> {
    runner: R,
    thermal: ThermalProbe<F>,
    cpu: CpuUsageProbe<F>,
    gpu: GpuLoadProbe<F>,
    memory: MemoryUsageProbe<F>,
    disk: DiskUsageProbe<F>,
    network: Option<NetworkProbe<R>>,
    ping_timeout: Duration,
    service_timeout: Duration,
}

impl<F: FileSystem + Clone, R: CommandRunner + Clone> Collector<F, R> {
    /// Creates a collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Command runner (real or mock)
    /// * `settings` - Paths and time bounds for every probe
    pub fn new(fs: F, runner: R, settings: &Settings) -> Self {
        let network = settings.speedtest_command.as_ref().map(|command| {
            NetworkProbe::new(runner.clone(), command.clone(), settings.speedtest_timeout)
        });

        Self {
            thermal: ThermalProbe::new(fs.clone(), &settings.thermal_path),
            cpu: CpuUsageProbe::new(fs.clone(), &settings.proc_path, settings.cpu_window),
            gpu: GpuLoadProbe::new(fs.clone(), settings.gpu_load_paths.clone()),
            memory: MemoryUsageProbe::new(fs.clone(), &settings.proc_path),
            disk: DiskUsageProbe::new(fs, &settings.root_mount),
            network,
            runner,
            ping_timeout: settings.ping_timeout,
            service_timeout: settings.service_timeout,
        }
    }

    /// Collects one sample. Never fails: unreadable metrics are unavailable
    /// and status checks that fail report inactive/Offline.
    pub async fn collect(&self, config: &MonitorConfig) -> MetricSample {
        let start = Instant::now();
        let timestamp = format_timestamp(&Local::now());

        // Temperatures first, then usage over the CPU sampling window.
        let temps = sample(&self.thermal).await.unwrap_or_default();
        let cpu_usage = Metric::from(sample(&self.cpu).await);
        let gpu_usage = Metric::from(sample(&self.gpu).await);
        let ram_usage = Metric::from(sample(&self.memory).await);
        let disk_usage = Metric::from(sample(&self.disk).await);

        let network = match &self.network {
            Some(probe) => sample(probe).await,
            None => {
                debug!("network performance test disabled");
                None
            }
        };

        let service_statuses = self.service_statuses(&config.services).await;
        let device_statuses = self.device_statuses(&config.devices).await;

        let collected = MetricSample {
            timestamp,
            cpu_usage_percent: cpu_usage,
            cpu_temp_c: temps.cpu,
            gpu_usage_percent: gpu_usage,
            gpu_temp_c: temps.gpu,
            ram_usage_percent: ram_usage,
            disk_usage_percent: disk_usage,
            service_statuses,
            device_statuses,
            network_latency_ms: Metric::from(network.map(|n| n.latency_ms)),
            download_mbps: Metric::from(network.map(|n| n.download_mbps)),
            upload_mbps: Metric::from(network.map(|n| n.upload_mbps)),
        };

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            available = collected.available_metrics(),
            "sample collected"
        );
        collected
    }

    async fn service_statuses(&self, services: &Section<String>) -> String {
        let entries = match services {
            Section::Entries(entries) => entries,
            Section::Malformed(message) => return message.to_string(),
        };

        let mut statuses = Vec::with_capacity(entries.len());
        for unit in entries {
            let state = Liveness::new(&self.runner, unit, self.service_timeout)
                .check()
                .await;
            statuses.push(format!("{}: {}", unit, state));
        }
        statuses.join(STATUS_SEPARATOR)
    }

    async fn device_statuses(&self, devices: &Section<Device>) -> String {
        let entries = match devices {
            Section::Entries(entries) => entries,
            Section::Malformed(message) => return message.to_string(),
        };

        let mut statuses = Vec::with_capacity(entries.len());
        for device in entries {
            let state = Reachability::new(&self.runner, &device.address, self.ping_timeout)
                .check()
                .await;
            statuses.push(format!("{}: {}", device.name, state));
        }
        statuses.join(STATUS_SEPARATOR)
    }
}
