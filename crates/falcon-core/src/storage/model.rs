//! Sample structures for storage.
//!
//! A `MetricSample` is one row of the `metrics` table: a timestamp, ten
//! optional numeric readings and two status summaries. Readings stay typed
//! (`Metric`) until they are rendered as text for the store.

use std::fmt;

use serde::Serialize;

use crate::fmt::{UNAVAILABLE, format_number, round2};

/// A numeric reading that may be unavailable for this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metric(Option<f64>);

impl Metric {
    /// A reading that could not be taken.
    pub const fn unavailable() -> Self {
        Metric(None)
    }

    /// A reading rounded to two decimals. Non-finite values are unavailable.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Metric(Some(round2(value)))
        } else {
            Metric(None)
        }
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    pub fn value(&self) -> Option<f64> {
        self.0
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Metric::unavailable(), Metric::new)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => f.write_str(&format_number(v)),
            None => f.write_str(UNAVAILABLE),
        }
    }
}

/// One collection cycle, written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    /// Local time at cycle start, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub cpu_usage_percent: Metric,
    pub cpu_temp_c: Metric,
    pub gpu_usage_percent: Metric,
    pub gpu_temp_c: Metric,
    pub ram_usage_percent: Metric,
    /// Usage of the root filesystem.
    pub disk_usage_percent: Metric,
    /// `"name: active|inactive"` entries joined by `" | "`.
    pub service_statuses: String,
    /// `"name: Online|Offline"` entries joined by `" | "`.
    pub device_statuses: String,
    pub network_latency_ms: Metric,
    pub download_mbps: Metric,
    pub upload_mbps: Metric,
}

impl MetricSample {
    /// Column names in table order.
    pub const COLUMNS: [&'static str; 12] = [
        "timestamp",
        "cpu_usage_percent",
        "cpu_temp_c",
        "gpu_usage_percent",
        "gpu_temp_c",
        "ram_usage_percent",
        "disk_usage_percent",
        "service_statuses",
        "device_statuses",
        "network_latency_ms",
        "download_mbps",
        "upload_mbps",
    ];

    /// Renders every field as stored text, in `COLUMNS` order.
    pub fn to_row(&self) -> [String; 12] {
        [
            self.timestamp.clone(),
            self.cpu_usage_percent.to_string(),
            self.cpu_temp_c.to_string(),
            self.gpu_usage_percent.to_string(),
            self.gpu_temp_c.to_string(),
            self.ram_usage_percent.to_string(),
            self.disk_usage_percent.to_string(),
            self.service_statuses.clone(),
            self.device_statuses.clone(),
            self.network_latency_ms.to_string(),
            self.download_mbps.to_string(),
            self.upload_mbps.to_string(),
        ]
    }

    /// Number of numeric readings that were available.
    pub fn available_metrics(&self) -> usize {
        [
            self.cpu_usage_percent,
            self.cpu_temp_c,
            self.gpu_usage_percent,
            self.gpu_temp_c,
            self.ram_usage_percent,
            self.disk_usage_percent,
            self.network_latency_ms,
            self.download_mbps,
            self.upload_mbps,
        ]
        .iter()
        .filter(|m| m.is_available())
        .count()
    }
}
