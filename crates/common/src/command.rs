//! External command execution
//!
//! The controller drives the gadget through shell commands (modprobe, sync).
//! [`CommandRunner`] is the seam: the production [`ShellRunner`] spawns
//! `sh -c` with a bounded timeout, while tests substitute a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Default upper bound on a single command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code; -1 when terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
}

/// Runs one command line and reports how it went.
///
/// A non-zero exit status is a normal, reportable outcome and arrives as
/// `Ok(output)`; only spawn failures and timeouts surface as errors. Callers
/// in the bounce path absorb both and carry on.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError>;
}

/// Executes command lines through `sh -c` with captured output.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new("sh")
                .arg("-c")
                .arg(command)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CommandError::TimedOut(self.timeout))??;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
