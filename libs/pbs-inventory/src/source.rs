//! Status command collaborator
//!
//! The parsers only need "the raw status text of host X". [`StatusSource`] is
//! the seam that produces it; [`CommandStatusSource`] runs the scheduler's
//! node status command as a child process.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::StatusCommandError;

/// Default node status command of Torque
pub const DEFAULT_STATUS_PROGRAM: &str = "pbsnodes";

/// Produces the raw status output of one host
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Query the status of `hostname`.
    ///
    /// # Errors
    ///
    /// Returns a [`StatusCommandError`] if the status cannot be obtained.
    async fn query(&self, hostname: &str) -> Result<String, StatusCommandError>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Box<T> {
    async fn query(&self, hostname: &str) -> Result<String, StatusCommandError> {
        (**self).query(hostname).await
    }
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for std::sync::Arc<T> {
    async fn query(&self, hostname: &str) -> Result<String, StatusCommandError> {
        (**self).query(hostname).await
    }
}

/// Runs `<program> [args...] <hostname>` and returns its stdout
#[derive(Debug, Clone)]
pub struct CommandStatusSource {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandStatusSource {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Arguments placed before the hostname
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the command if it has not finished after `timeout`.
    ///
    /// Without a timeout a hanging command blocks the caller indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, hostname: &str) -> Result<std::process::Output, StatusCommandError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(hostname)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd.output();
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, output).await.map_err(|_| {
                StatusCommandError::Timeout {
                    program: self.program.clone(),
                    timeout,
                }
            })?,
            None => output.await,
        };

        result.map_err(|source| StatusCommandError::Launch {
            program: self.program.clone(),
            source,
        })
    }
}

impl Default for CommandStatusSource {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_PROGRAM)
    }
}

#[async_trait]
impl StatusSource for CommandStatusSource {
    async fn query(&self, hostname: &str) -> Result<String, StatusCommandError> {
        tracing::debug!(program = %self.program, hostname, "Running status command");
        let output = self.run(hostname).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            tracing::warn!(
                program = %self.program,
                hostname,
                code = ?output.status.code(),
                stderr = %stderr,
                "Status command failed"
            );
            return Err(StatusCommandError::NonZeroExit {
                program: self.program.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|_| StatusCommandError::InvalidOutput {
            program: self.program.clone(),
        })
    }
}
