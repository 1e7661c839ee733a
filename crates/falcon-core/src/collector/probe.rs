//! Common interface of all data-source readers.
//!
//! Every probe reports either a reading or a `ProbeError`. The aggregator
//! never calls `read` directly; it goes through [`sample`], which is the one
//! place a probe failure is turned into "unavailable" and logged.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::collector::procfs::parser::ParseError;
use crate::collector::traits::CommandError;

/// Error type for probe failures.
#[derive(Debug)]
pub enum ProbeError {
    /// The host does not provide this interface at all.
    Missing(String),
    /// I/O error reading a host interface.
    Io(std::io::Error),
    /// Host data did not have the expected format.
    Parse(String),
    /// An external utility could not be run to completion.
    Command(CommandError),
    /// An external utility exited unsuccessfully.
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Missing(what) => write!(f, "{} not available", what),
            ProbeError::Io(e) => write!(f, "I/O error: {}", e),
            ProbeError::Parse(msg) => write!(f, "parse error: {}", msg),
            ProbeError::Command(e) => write!(f, "{}", e),
            ProbeError::CommandFailed {
                program,
                code,
                stderr,
            } => {
                match code {
                    Some(code) => write!(f, "{} failed with exit status {}", program, code)?,
                    None => write!(f, "{} was terminated by a signal", program)?,
                }
                if !stderr.is_empty() {
                    write!(f, ": \"{}\"", stderr)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        ProbeError::Io(e)
    }
}

impl From<ParseError> for ProbeError {
    fn from(e: ParseError) -> Self {
        ProbeError::Parse(e.message)
    }
}

impl From<CommandError> for ProbeError {
    fn from(e: CommandError) -> Self {
        ProbeError::Command(e)
    }
}

/// A single, independently failing data-source reader.
#[async_trait]
pub trait Probe: Send + Sync {
    type Output: Send;

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Takes one reading from the host.
    async fn read(&self) -> Result<Self::Output, ProbeError>;
}

/// Reads `probe`, turning any failure into `None` plus a diagnostic.
///
/// Interfaces the host simply lacks are logged at debug level; anything else
/// is a warning.
pub async fn sample<P: Probe + ?Sized>(probe: &P) -> Option<P::Output> {
    match probe.read().await {
        Ok(value) => Some(value),
        Err(ProbeError::Missing(what)) => {
            debug!(probe = probe.name(), "{} not available", what);
            None
        }
        Err(e) => {
            warn!(probe = probe.name(), "reading {} failed: {}", probe.name(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fixed(Result<f64, fn() -> ProbeError>);

    #[async_trait]
    impl Probe for Fixed {
        type Output = f64;

        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn read(&self) -> Result<f64, ProbeError> {
            self.0.map_err(|make| make())
        }
    }

    #[tokio::test]
    async fn test_sample_passes_value_through() {
        assert_eq!(sample(&Fixed(Ok(42.5))).await, Some(42.5));
    }

    #[tokio::test]
    async fn test_sample_absorbs_every_error_kind() {
        let errors: [fn() -> ProbeError; 4] = [
            || ProbeError::Missing("GPU load interface".into()),
            || ProbeError::Io(std::io::Error::other("permission denied")),
            || ProbeError::Parse("bad integer".into()),
            || {
                ProbeError::Command(CommandError::TimedOut {
                    program: "ping".into(),
                    timeout: Duration::from_secs(4),
                })
            },
        ];
        for make in errors {
            assert_eq!(sample(&Fixed(Err(make))).await, None);
        }
    }

    #[test]
    fn test_command_failed_display() {
        let with_stderr = ProbeError::CommandFailed {
            program: "speedtest-cli".into(),
            code: Some(1),
            stderr: "Cannot retrieve speedtest configuration".into(),
        };
        assert_eq!(
            with_stderr.to_string(),
            "speedtest-cli failed with exit status 1: \"Cannot retrieve speedtest configuration\""
        );

        let bare = ProbeError::CommandFailed {
            program: "systemctl".into(),
            code: Some(3),
            stderr: String::new(),
        };
        assert_eq!(bare.to_string(), "systemctl failed with exit status 3");
    }
}
