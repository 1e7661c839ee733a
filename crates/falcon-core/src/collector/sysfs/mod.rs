//! Probes reading `/sys` hardware interfaces.

mod gpu;
mod thermal;

pub use gpu::{DEFAULT_GPU_LOAD_PATHS, GpuLoadProbe};
pub use thermal::{Temperatures, ThermalChannel, ThermalProbe, ZONE_CHANNELS, channel_for};
