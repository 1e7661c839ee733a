//! falcon-core - collection and persistence engine for the falcon host monitor.
//!
//! Provides:
//! - `collector` - probes (sysfs, procfs, external commands) and the sample aggregator
//! - `config` - runtime settings and the per-cycle monitor configuration
//! - `storage` - sample model and the append-only SQLite store
//! - `runner` - the scheduling loop
//! - `fmt` - rounding and text rendering of metric values

pub mod collector;
pub mod config;
pub mod fmt;
pub mod runner;
pub mod storage;

pub use collector::Collector;
pub use config::{MonitorConfig, Settings};
pub use runner::Scheduler;
pub use storage::{MetricSample, MetricStore};
