//! Network latency and throughput via `speedtest-cli --json`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::collector::CommandRunner;
use crate::collector::probe::{Probe, ProbeError};
use crate::fmt::round2;

/// Result of one speed test, already rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkPerformance {
    pub latency_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

/// Fields of the `speedtest-cli --json` report this collector uses.
#[derive(Debug, Deserialize)]
struct SpeedtestReport {
    /// Milliseconds.
    #[serde(default)]
    ping: f64,
    /// Bits per second.
    #[serde(default)]
    download: f64,
    /// Bits per second.
    #[serde(default)]
    upload: f64,
}

/// Parses the machine-readable report of `speedtest-cli --json`.
pub fn parse_speedtest(stdout: &[u8]) -> Result<NetworkPerformance, ProbeError> {
    let report: SpeedtestReport = serde_json::from_slice(stdout).map_err(|e| {
        ProbeError::Parse(format!("could not parse JSON output from speedtest: {}", e))
    })?;

    Ok(NetworkPerformance {
        latency_ms: round2(report.ping),
        download_mbps: round2(report.download / 1e6),
        upload_mbps: round2(report.upload / 1e6),
    })
}

/// Runs one speed test per cycle. All three figures succeed or fail together.
pub struct NetworkProbe<R: CommandRunner> {
    runner: R,
    command: String,
    timeout: Duration,
}

impl<R: CommandRunner> NetworkProbe<R> {
    pub fn new(runner: R, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl<R: CommandRunner> Probe for NetworkProbe<R> {
    type Output = NetworkPerformance;

    fn name(&self) -> &'static str {
        "network performance"
    }

    async fn read(&self) -> Result<NetworkPerformance, ProbeError> {
        info!("running network performance test");

        let output = self
            .runner
            .run(&self.command, &["--json"], self.timeout)
            .await?;

        if !output.success() {
            return Err(ProbeError::CommandFailed {
                program: self.command.clone(),
                code: output.code,
                stderr: output.stderr_text(),
            });
        }

        parse_speedtest(&output.stdout)
    }
}
