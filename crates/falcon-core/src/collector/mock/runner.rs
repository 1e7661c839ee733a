//! Scripted command runner for testing probes without spawning processes.

use crate::collector::traits::{CommandError, CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned outcome of a mocked command.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// The process ran and exited with `code`.
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// The executable does not exist.
    NotFound,
    /// The process exceeded its time bound.
    TimedOut,
}

impl MockResponse {
    /// Exit status 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        MockResponse::Exit {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Nonzero exit with the given stderr.
    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        MockResponse::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, MockResponse>,
    calls: Vec<(String, Duration)>,
}

/// Command runner that answers from a script keyed by the full command line
/// (`"ping -c 1 -W 2 10.0.0.1"`). Unscripted commands behave as not installed.
///
/// Clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    script: Arc<Mutex<Script>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for an exact command line.
    pub fn respond(&self, command_line: &str, response: MockResponse) -> &Self {
        self.lock().responses.insert(command_line.to_string(), response);
        self
    }

    /// Returns every command line run so far, with the timeout it was given.
    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test thread must not hide the script from the others.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let mut command_line = program.to_string();
        for arg in args {
            command_line.push(' ');
            command_line.push_str(arg);
        }

        let response = {
            let mut script = self.lock();
            script.calls.push((command_line.clone(), timeout));
            script.responses.get(&command_line).cloned()
        };

        match response {
            Some(MockResponse::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(CommandOutput {
                code: Some(code),
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            }),
            Some(MockResponse::TimedOut) => Err(CommandError::TimedOut {
                program: program.to_string(),
                timeout,
            }),
            Some(MockResponse::NotFound) | None => {
                Err(CommandError::NotFound(program.to_string()))
            }
        }
    }
}
