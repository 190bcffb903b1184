pub mod adb;
pub mod command;
pub mod error;
pub mod runner;
pub mod scrcpy;
pub mod target;

#[cfg(test)]
pub(crate) mod fake;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use adb::Device;
pub use command::{CommandResult, CommandSpec, Tool};
pub use error::DriverError;
pub use scrcpy::{MirrorHandle, MirrorStatus};
pub use target::ConnectionTarget;

use crate::utils::binary_resolver::BinaryResolver;
use runner::{CommandRunner, RunError, SystemRunner};

/// Invokes `adb` and `scrcpy` as opaque external processes
pub struct Driver {
    resolver: BinaryResolver,
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl Driver {
    pub fn new(resolver: BinaryResolver) -> Self {
        Self::with_runner(resolver, Arc::new(SystemRunner))
    }

    pub fn with_runner(resolver: BinaryResolver, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            resolver,
            runner,
            timeout: None,
        }
    }

    /// Kill short-lived commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the binary and run `spec` to completion.
    ///
    /// Nothing is started when the binary cannot be resolved.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, DriverError> {
        let program = self.resolver.find(spec.tool)?;
        log::debug!("Running {} ({})", spec, program.display());

        match self.runner.output(&program, &spec.args, self.timeout).await {
            Ok(result) => {
                log::debug!("{} exited with {}", spec, result.exit_code);
                Ok(result)
            }
            Err(RunError::TimedOut(after)) => Err(DriverError::TimedOut {
                command: spec.clone(),
                after,
            }),
            Err(RunError::Io(source)) => Err(Self::launch_error(spec, &program, source)),
        }
    }

    fn launch_error(spec: &CommandSpec, program: &Path, source: io::Error) -> DriverError {
        if source.kind() == io::ErrorKind::NotFound {
            DriverError::BinaryNotFound {
                tool: spec.tool,
                checked: vec![format!("Resolved: {:?}", program)],
            }
        } else {
            DriverError::Spawn {
                tool: spec.tool,
                source,
            }
        }
    }
}
