//! Probes backed by external utilities.

mod speedtest;
mod status;

pub use speedtest::{NetworkPerformance, NetworkProbe, parse_speedtest};
pub use status::{DeviceState, Liveness, Reachability, ServiceState};
