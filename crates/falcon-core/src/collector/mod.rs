//! Host metrics collection.
//!
//! This module provides the probes that read the host and the `Collector`
//! that runs them for one cycle. Host access goes through two seams so every
//! probe can be exercised against mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Collector                           │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────────┐  │
//! │  │    sysfs     │ │    procfs    │ │       command        │  │
//! │  │ - thermal    │ │ - /proc/stat │ │ - speedtest-cli      │  │
//! │  │ - gpu load   │ │ - meminfo    │ │ - ping / systemctl   │  │
//! │  └──────┬───────┘ └──────┬───────┘ └──────────┬───────────┘  │
//! │         └───────┬────────┘                    │              │
//! │          ┌──────▼──────┐              ┌───────▼───────┐      │
//! │          │ FileSystem  │ (trait)      │ CommandRunner │      │
//! │          └──────┬──────┘              └───────┬───────┘      │
//! └─────────────────┼─────────────────────────────┼──────────────┘
//!            ┌──────┴──────┐               ┌──────┴───────┐
//!       ┌────▼───┐   ┌─────▼──┐      ┌─────▼──────┐ ┌─────▼──────┐
//!       │ RealFs │   │ MockFs │      │SystemRunner│ │ MockRunner │
//!       └────────┘   └────────┘      └────────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//!
//! use falcon_core::collector::Collector;
//! use falcon_core::collector::mock::{MockFs, MockRunner};
//! use falcon_core::{MonitorConfig, Settings};
//!
//! let settings = Settings { cpu_window: Duration::ZERO, ..Settings::default() };
//! let collector = Collector::new(MockFs::new(), MockRunner::new(), &settings);
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let sample = rt.block_on(collector.collect(&MonitorConfig::default()));
//! assert!(!sample.cpu_temp_c.is_available());
//! assert_eq!(sample.service_statuses, "");
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod command;
pub mod disk;
pub mod mock;
pub mod probe;
pub mod procfs;
pub mod sysfs;
pub mod traits;

pub use collector::{Collector, STATUS_SEPARATOR};
pub use probe::{Probe, ProbeError, sample};
pub use traits::{
    CommandError, CommandOutput, CommandRunner, DiskSpace, FileSystem, RealFs, SystemRunner,
};
