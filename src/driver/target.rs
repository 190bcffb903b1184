use std::fmt;

use super::command::endpoint;
use super::error::DriverError;

/// Host and port of a device endpoint typed in by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
}

impl ConnectionTarget {
    /// Build a target from the separate host and port fields
    pub fn parse(host: &str, port: &str) -> Result<Self, DriverError> {
        let host = host.trim();
        let port = port.trim();
        if host.is_empty() || port.is_empty() {
            return Err(DriverError::InvalidInput(
                "Please enter both IP and port".to_string(),
            ));
        }
        let port: u16 = port
            .parse()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                DriverError::InvalidInput(format!("Port must be between 1 and 65535, got '{}'", port))
            })?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Parse an `ip:port` endpoint
    pub fn from_endpoint(s: &str) -> Result<Self, DriverError> {
        match s.trim().rsplit_once(':') {
            Some((host, port)) => Self::parse(host, port),
            None => Err(DriverError::InvalidInput(format!(
                "Expected IP:PORT, got '{}'",
                s.trim()
            ))),
        }
    }

    /// The `ip:port` serial adb and scrcpy use for this device
    pub fn serial(&self) -> String {
        endpoint(&self.host, self.port)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial())
    }
}
