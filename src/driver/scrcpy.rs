use std::fmt;
use std::io;
use std::time::Duration;

use super::command::CommandSpec;
use super::error::DriverError;
use super::runner::DetachedProcess;
use super::Driver;

/// Observed state of a launched mirror window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStatus {
    Running,
    Exited(i32),
}

impl fmt::Display for MirrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorStatus::Running => f.write_str("running"),
            MirrorStatus::Exited(code) => write!(f, "exited with code {}", code),
        }
    }
}

/// Handle on a detached scrcpy process, kept only for status polling
#[derive(Debug)]
pub struct MirrorHandle {
    serial: String,
    process: Box<dyn DetachedProcess>,
}

impl MirrorHandle {
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }

    pub fn poll(&mut self) -> io::Result<MirrorStatus> {
        Ok(match self.process.try_exit_code()? {
            Some(code) => MirrorStatus::Exited(code),
            None => MirrorStatus::Running,
        })
    }

    /// Poll for up to `window`, returning early once scrcpy has exited.
    ///
    /// scrcpy fails within a moment when the serial is unknown or the device
    /// is unauthorized, so this separates a failed launch from a running one.
    pub async fn wait_for_early_exit(&mut self, window: Duration) -> io::Result<MirrorStatus> {
        let step = Duration::from_millis(100);
        let mut waited = Duration::ZERO;
        loop {
            let status = self.poll()?;
            if status != MirrorStatus::Running || waited >= window {
                return Ok(status);
            }
            tokio::time::sleep(step).await;
            waited += step;
        }
    }

    /// Close the mirror window if it is still open
    pub fn stop(&mut self) -> io::Result<()> {
        match self.poll()? {
            MirrorStatus::Running => self.process.kill(),
            MirrorStatus::Exited(_) => Ok(()),
        }
    }
}

impl Driver {
    /// Launch `scrcpy -s <serial> --stay-awake` without waiting for it
    pub fn mirror(&self, serial: &str) -> Result<MirrorHandle, DriverError> {
        let serial = serial.trim();
        if serial.is_empty() {
            return Err(DriverError::InvalidInput(
                "No device serial to mirror".to_string(),
            ));
        }
        let spec = CommandSpec::mirror(serial);
        let program = self.resolver.find(spec.tool)?;
        log::debug!("Launching {} ({})", spec, program.display());

        let process = self
            .runner
            .spawn_detached(&program, &spec.args)
            .map_err(|source| Self::launch_error(&spec, &program, source))?;

        Ok(MirrorHandle {
            serial: serial.to_string(),
            process,
        })
    }
}
