//! Binary status checks: device reachability and service liveness.
//!
//! Both run one bounded external command per target and keep no detail about
//! why a check failed; a failure is simply Offline / inactive.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::collector::{CommandOutput, CommandRunner};
use crate::collector::probe::{Probe, ProbeError};

/// Extra time granted to `ping` beyond its own echo wait before it is killed.
const PING_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Online,
    Offline,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Online => f.write_str("Online"),
            DeviceState::Offline => f.write_str("Offline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Active,
    Inactive,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Active => f.write_str("active"),
            ServiceState::Inactive => f.write_str("inactive"),
        }
    }
}

fn require_success(program: &str, output: CommandOutput) -> Result<(), ProbeError> {
    if output.success() {
        Ok(())
    } else {
        Err(ProbeError::CommandFailed {
            program: program.to_string(),
            code: output.code,
            stderr: output.stderr_text(),
        })
    }
}

/// One ICMP echo to `address` via `ping -c 1 -W <wait>`.
pub struct Reachability<'a, R: CommandRunner> {
    runner: &'a R,
    address: &'a str,
    echo_wait: Duration,
}

impl<'a, R: CommandRunner> Reachability<'a, R> {
    pub fn new(runner: &'a R, address: &'a str, echo_wait: Duration) -> Self {
        Self {
            runner,
            address,
            echo_wait,
        }
    }

    pub async fn check(&self) -> DeviceState {
        match self.read().await {
            Ok(()) => DeviceState::Online,
            Err(e) => {
                debug!(address = self.address, "device unreachable: {}", e);
                DeviceState::Offline
            }
        }
    }
}

#[async_trait]
impl<'a, R: CommandRunner> Probe for Reachability<'a, R> {
    type Output = ();

    fn name(&self) -> &'static str {
        "reachability"
    }

    async fn read(&self) -> Result<(), ProbeError> {
        let wait = self.echo_wait.as_secs().max(1).to_string();
        let output = self
            .runner
            .run(
                "ping",
                &["-c", "1", "-W", wait.as_str(), self.address],
                self.echo_wait.saturating_add(PING_GRACE),
            )
            .await?;
        require_success("ping", output)
    }
}

/// `systemctl is-active --quiet <unit>`.
pub struct Liveness<'a, R: CommandRunner> {
    runner: &'a R,
    unit: &'a str,
    timeout: Duration,
}

impl<'a, R: CommandRunner> Liveness<'a, R> {
    pub fn new(runner: &'a R, unit: &'a str, timeout: Duration) -> Self {
        Self {
            runner,
            unit,
            timeout,
        }
    }

    pub async fn check(&self) -> ServiceState {
        match self.read().await {
            Ok(()) => ServiceState::Active,
            Err(e) => {
                debug!(unit = self.unit, "service not active: {}", e);
                ServiceState::Inactive
            }
        }
    }
}

#[async_trait]
impl<'a, R: CommandRunner> Probe for Liveness<'a, R> {
    type Output = ();

    fn name(&self) -> &'static str {
        "liveness"
    }

    async fn read(&self) -> Result<(), ProbeError> {
        let output = self
            .runner
            .run(
                "systemctl",
                &["is-active", "--quiet", self.unit],
                self.timeout,
            )
            .await?;
        require_success("systemctl", output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockResponse, MockRunner};

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_device_online() {
        let runner = MockRunner::new();
        runner.respond("ping -c 1 -W 2 192.168.1.1", MockResponse::ok("1 received"));

        let state = Reachability::new(&runner, "192.168.1.1", WAIT).check().await;
        assert_eq!(state, DeviceState::Online);
        // Outer bound covers the echo wait plus grace.
        assert_eq!(runner.calls()[0].1, Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_device_offline_on_any_failure() {
        let runner = MockRunner::new();
        runner.respond("ping -c 1 -W 2 10.0.0.1", MockResponse::fail(1, ""));
        runner.respond("ping -c 1 -W 2 10.0.0.2", MockResponse::TimedOut);
        runner.respond("ping -c 1 -W 2 bad..host", MockResponse::fail(2, "unknown host"));

        for address in ["10.0.0.1", "10.0.0.2", "bad..host"] {
            let state = Reachability::new(&runner, address, WAIT).check().await;
            assert_eq!(state, DeviceState::Offline, "{}", address);
        }
    }

    #[tokio::test]
    async fn test_sub_second_wait_rounds_up() {
        let runner = MockRunner::new();
        runner.respond("ping -c 1 -W 1 10.0.0.1", MockResponse::ok(""));

        let state = Reachability::new(&runner, "10.0.0.1", Duration::from_millis(300))
            .check()
            .await;
        assert_eq!(state, DeviceState::Online);
    }

    #[tokio::test]
    async fn test_huge_wait_saturates_outer_bound() {
        let runner = MockRunner::new();
        runner.respond(
            "ping -c 1 -W 18446744073709551615 10.0.0.1",
            MockResponse::ok(""),
        );

        let state = Reachability::new(&runner, "10.0.0.1", Duration::from_secs(u64::MAX))
            .check()
            .await;
        assert_eq!(state, DeviceState::Online);
        assert_eq!(runner.calls()[0].1, Duration::MAX);
    }

    #[tokio::test]
    async fn test_service_states() {
        let runner = MockRunner::new();
        runner.respond("systemctl is-active --quiet sshd", MockResponse::ok(""));
        runner.respond("systemctl is-active --quiet nginx", MockResponse::fail(3, ""));

        let timeout = Duration::from_secs(5);
        assert_eq!(
            Liveness::new(&runner, "sshd", timeout).check().await,
            ServiceState::Active
        );
        assert_eq!(
            Liveness::new(&runner, "nginx", timeout).check().await,
            ServiceState::Inactive
        );
        // systemctl missing entirely
        assert_eq!(
            Liveness::new(&runner, "docker", timeout).check().await,
            ServiceState::Inactive
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DeviceState::Online.to_string(), "Online");
        assert_eq!(DeviceState::Offline.to_string(), "Offline");
        assert_eq!(ServiceState::Active.to_string(), "active");
        assert_eq!(ServiceState::Inactive.to_string(), "inactive");
    }
}
