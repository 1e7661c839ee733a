//! Abstractions for host access to enable testing and mocking.
//!
//! The `FileSystem` trait lets probes read sysfs/procfs either from the real
//! host or from an in-memory mock. The `CommandRunner` trait does the same for
//! external utilities (`ping`, `systemctl`, `speedtest-cli`).

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Capacity of a mounted filesystem, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskSpace {
    pub total: u64,
    /// Free blocks, including those reserved for root.
    pub free: u64,
    /// Free blocks usable by unprivileged processes.
    pub available: u64,
}

/// Abstraction for filesystem operations.
///
/// This trait allows probes to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Returns capacity of the filesystem holding `mount_point`.
    fn disk_usage(&self, mount_point: &Path) -> io::Result<DiskSpace>;
}

/// Real filesystem implementation that delegates to `std::fs` and `statvfs(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn disk_usage(&self, mount_point: &Path) -> io::Result<DiskSpace> {
        let c_path = CString::new(mount_point.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is NUL-terminated and stat is a valid out-pointer;
        // statvfs only writes into stat.
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }

        let block_size = stat.f_frsize as u64;
        Ok(DiskSpace {
            total: stat.f_blocks as u64 * block_size,
            free: stat.f_bfree as u64 * block_size,
            available: stat.f_bavail as u64 * block_size,
        })
    }
}

/// Captured result of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Returns `true` if the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns stderr as trimmed lossy UTF-8.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Error type for external command invocation.
#[derive(Debug)]
pub enum CommandError {
    /// The executable is not installed or not on `PATH`.
    NotFound(String),
    /// The process could not be started or awaited.
    Io { program: String, source: io::Error },
    /// The process did not finish within its time bound and was killed.
    TimedOut { program: String, timeout: Duration },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotFound(program) => write!(f, "'{}' command not found", program),
            CommandError::Io { program, source } => write!(f, "{}: {}", program, source),
            CommandError::TimedOut { program, timeout } => {
                write!(f, "{} timed out after {}s", program, timeout.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Abstraction for running external utilities with a hard time bound.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting at most `timeout` for it to exit.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// Runs commands as real child processes via `tokio::process`.
///
/// A process that outlives its timeout is killed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => CommandError::NotFound(program.to_string()),
                _ => CommandError::Io {
                    program: program.to_string(),
                    source: e,
                },
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(Err(e)) => Err(CommandError::Io {
                program: program.to_string(),
                source: e,
            }),
            Err(_) => Err(CommandError::TimedOut {
                program: program.to_string(),
                timeout,
            }),
        }
    }
}
