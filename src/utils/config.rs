use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::driver::Tool;
use crate::pairing::payload::{DEFAULT_NAME_LENGTH, DEFAULT_PASSWORD_LENGTH};
use crate::utils::binary_resolver::BinaryResolver;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit adb executable, bypassing PATH lookup
    pub adb_path: Option<PathBuf>,

    /// Explicit scrcpy executable, bypassing PATH lookup
    pub scrcpy_path: Option<PathBuf>,

    /// Kill pair/connect/devices calls after this many seconds (unbounded if unset)
    pub command_timeout_secs: Option<u64>,

    /// Pairing port prefilled for manual pairing
    pub default_pairing_port: u16,

    /// adb TCP port used for connecting after pairing
    pub default_connect_port: u16,

    /// Length of the random QR service name
    pub name_length: usize,

    /// Length of the random QR password
    pub password_length: usize,

    /// Suggest a device IP from the host's LAN address on start-up
    pub auto_detect_ip: bool,

    /// Last octet substituted into the host address for the suggestion
    pub suggested_host_octet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adb_path: None,
            scrcpy_path: None,
            command_timeout_secs: None,
            default_pairing_port: 39083,
            default_connect_port: 5555,
            name_length: DEFAULT_NAME_LENGTH,
            password_length: DEFAULT_PASSWORD_LENGTH,
            auto_detect_ip: true,
            suggested_host_octet: 102,
        }
    }
}

impl Config {
    /// `~/.adb-qr-mirror/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".adb-qr-mirror").join("config.yaml"))
    }

    /// Load from `path`, or from the default location when it exists.
    ///
    /// An explicitly given file must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name_length == 0 || self.password_length == 0 {
            anyhow::bail!("name_length and password_length must be at least 1");
        }
        if self.default_pairing_port == 0 || self.default_connect_port == 0 {
            anyhow::bail!("default ports must be between 1 and 65535");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    pub fn resolver(&self) -> BinaryResolver {
        BinaryResolver::new()
            .with_override(Tool::Adb, self.adb_path.clone())
            .with_override(Tool::Scrcpy, self.scrcpy_path.clone())
    }
}
