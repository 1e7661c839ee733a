//! Probes reading the Linux `/proc` filesystem.

pub mod parser;
mod usage;

pub use usage::{CpuUsageProbe, MemoryUsageProbe};
