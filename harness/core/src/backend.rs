use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{process::Command, time::timeout};
use tracing::debug;

use crate::{adjust_timeout, timeouts};

/// Errors returned from stack CLI invocations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} exited with status {status:?}\nstderr:\n{stderr}\nstdout:\n{stdout}")]
    Failed {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// One prepared CLI invocation: the argv plus a short description used in
/// logs and error messages.
#[derive(Clone, Debug)]
pub struct StackCommand {
    description: String,
    args: Vec<String>,
}

impl StackCommand {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Subprocess seam for the stack CLI. Everything the harness asks of the
/// CLI goes through this trait so tests can substitute a scripted fake.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run a command and hand back its stdout.
    async fn output(&self, command: &StackCommand) -> Result<String, BackendError>;

    /// Run a command for effect only.
    async fn run(&self, command: &StackCommand) -> Result<(), BackendError> {
        self.output(command).await.map(drop)
    }
}

/// Production backend: spawns the stack binary for every command, with a
/// per-command timeout.
pub struct CliBackend {
    program: PathBuf,
    env: Vec<(String, String)>,
    command_timeout: Duration,
}

impl CliBackend {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: Vec::new(),
            command_timeout: timeouts::command_timeout(),
        }
    }

    /// Resolve the CLI binary: an explicit path wins, then `STACK_CLI`,
    /// then `stack` on `PATH`.
    #[must_use]
    pub fn resolve(client_bin: Option<&Path>) -> Self {
        let program = client_bin
            .map(Path::to_path_buf)
            .or_else(harness_env::stack_cli)
            .unwrap_or_else(|| PathBuf::from("stack"));
        Self::new(program)
    }

    /// Environment variable set on every spawned command.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Backend for CliBackend {
    async fn output(&self, command: &StackCommand) -> Result<String, BackendError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let limit = adjust_timeout(self.command_timeout);
        debug!(
            command = command.description(),
            program = %self.program.display(),
            timeout = ?limit,
            "running stack command"
        );

        let output = timeout(limit, cmd.output())
            .await
            .map_err(|_| BackendError::Timeout {
                command: command.description().to_owned(),
                timeout: limit,
            })?
            .map_err(|source| BackendError::Spawn {
                command: command.description().to_owned(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(BackendError::Failed {
                command: command.description().to_owned(),
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
