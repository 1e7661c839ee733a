//! Test doubles for the host access seams.
//!
//! `MockFs` simulates sysfs/procfs in memory and `MockRunner` answers external
//! commands from a script, so probes can be exercised on any machine.

mod filesystem;
mod runner;

pub use filesystem::MockFs;
pub use runner::{MockResponse, MockRunner};
