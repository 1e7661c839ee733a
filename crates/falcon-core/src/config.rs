//! Configuration: process-wide `Settings` and the per-cycle `MonitorConfig`.
//!
//! `Settings` is built once at startup and shared read-only. `MonitorConfig`
//! is the list of services and devices to check, re-read from its JSON file
//! at the start of every cycle so edits take effect without a restart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::error;

use crate::collector::sysfs::DEFAULT_GPU_LOAD_PATHS;
use crate::storage::store::is_valid_table_name;

/// Process-wide runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// JSON file listing services and devices.
    pub config_path: PathBuf,
    /// SQLite database file.
    pub database_path: PathBuf,
    pub table: String,
    /// Pause between cycles.
    pub interval: Duration,
    pub proc_path: PathBuf,
    pub thermal_path: PathBuf,
    /// GPU load files, in probing order.
    pub gpu_load_paths: Vec<PathBuf>,
    /// Mount point whose usage is reported as disk usage.
    pub root_mount: PathBuf,
    /// Window over which CPU usage is sampled.
    pub cpu_window: Duration,
    /// ICMP echo wait per device.
    pub ping_timeout: Duration,
    /// Bound on each `systemctl` query.
    pub service_timeout: Duration,
    /// Speed test executable, or `None` to skip the network test.
    pub speedtest_command: Option<String>,
    pub speedtest_timeout: Duration,
    /// Run a single cycle and exit.
    pub once: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("ips.json"),
            database_path: PathBuf::from("health_monitor.db"),
            table: "metrics".to_string(),
            interval: Duration::from_secs(120),
            proc_path: PathBuf::from("/proc"),
            thermal_path: PathBuf::from("/sys/class/thermal"),
            gpu_load_paths: DEFAULT_GPU_LOAD_PATHS.iter().map(PathBuf::from).collect(),
            root_mount: PathBuf::from("/"),
            cpu_window: Duration::from_secs(1),
            ping_timeout: Duration::from_secs(2),
            service_timeout: Duration::from_secs(5),
            speedtest_command: Some("speedtest-cli".to_string()),
            speedtest_timeout: Duration::from_secs(120),
            once: false,
        }
    }
}

/// Error type for invalid settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    ZeroInterval,
    ZeroTimeout(&'static str),
    InvalidTable(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::ZeroInterval => write!(f, "interval must be greater than zero"),
            SettingsError::ZeroTimeout(which) => {
                write!(f, "{} timeout must be greater than zero", which)
            }
            SettingsError::InvalidTable(name) => {
                write!(f, "table name '{}' is not a valid identifier", name)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl Settings {
    /// Checks invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.interval.is_zero() {
            return Err(SettingsError::ZeroInterval);
        }
        if self.ping_timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout("ping"));
        }
        if self.service_timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout("service"));
        }
        if self.speedtest_timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout("speedtest"));
        }
        if !is_valid_table_name(&self.table) {
            return Err(SettingsError::InvalidTable(self.table.clone()));
        }
        Ok(())
    }
}

/// Error type for reading the monitor configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "invalid JSON: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// One section of the monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Entries(Vec<T>),
    /// The key had the wrong shape; the message is reported as that
    /// section's only status line.
    Malformed(&'static str),
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section::Entries(Vec::new())
    }
}

/// A device to ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub address: String,
}

/// Services and devices to check, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorConfig {
    pub services: Section<String>,
    pub devices: Section<Device>,
}

impl MonitorConfig {
    /// Reads the configuration file. Never fails: a missing file is an empty
    /// configuration, an unreadable or malformed one is logged and treated the
    /// same way.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                error!(
                    "could not parse JSON from '{}', check syntax: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration JSON text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)?;
        Ok(Self::from_value(&value))
    }

    /// Builds a configuration from a parsed JSON document. A document that is
    /// not an object has no sections.
    pub fn from_value(value: &Value) -> Self {
        let services = match value.get("services") {
            None => Section::default(),
            Some(Value::Array(items)) => Section::Entries(items.iter().map(json_text).collect()),
            Some(_) => Section::Malformed("'services' key is not a list"),
        };

        let devices = match value.get("devices") {
            None => Section::default(),
            Some(Value::Object(map)) => Section::Entries(
                map.iter()
                    .map(|(name, address)| Device {
                        name: name.clone(),
                        address: json_text(address),
                    })
                    .collect(),
            ),
            Some(_) => Section::Malformed("'devices' key is not a dictionary"),
        };

        Self { services, devices }
    }
}

/// Strings verbatim, anything else as its JSON text.
fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
