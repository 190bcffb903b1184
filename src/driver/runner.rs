//! Process execution seam between the driver and the operating system.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::command::CommandResult;

/// Failure of the process layer itself, independent of what the process printed
#[derive(Debug)]
pub enum RunError {
    Io(io::Error),
    TimedOut(Duration),
}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        RunError::Io(err)
    }
}

/// A spawned process the caller does not wait on
pub trait DetachedProcess: Send + std::fmt::Debug {
    fn id(&self) -> Option<u32>;

    /// Exit code once the process has finished, `None` while it is running
    fn try_exit_code(&mut self) -> io::Result<Option<i32>>;

    fn kill(&mut self) -> io::Result<()>;
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr
    async fn output(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, RunError>;

    /// Start without waiting; stderr stays on the terminal for error reports
    fn spawn_detached(&self, program: &Path, args: &[String])
        -> io::Result<Box<dyn DetachedProcess>>;
}

/// Runs real processes through `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, RunError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| RunError::TimedOut(limit))??,
            None => cmd.output().await?,
        };

        Ok(CommandResult {
            // Killed by a signal: no exit code
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn spawn_detached(
        &self,
        program: &Path,
        args: &[String],
    ) -> io::Result<Box<dyn DetachedProcess>> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()?;
        Ok(Box::new(child))
    }
}

impl DetachedProcess for Child {
    fn id(&self) -> Option<u32> {
        Child::id(self)
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self.try_wait()?.map(|status| status.code().unwrap_or(-1)))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.start_kill()
    }
}
