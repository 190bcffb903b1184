use std::ffi::OsString;
use std::path::PathBuf;

use crate::driver::{DriverError, Tool};

/// Resolves the external `adb` / `scrcpy` executables.
///
/// Lookup order: explicit override path, then the executable search path
/// (`PATH` unless a custom one is configured).
#[derive(Debug, Clone, Default)]
pub struct BinaryResolver {
    adb_override: Option<PathBuf>,
    scrcpy_override: Option<PathBuf>,
    search_path: Option<OsString>,
}

impl BinaryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, tool: Tool, path: Option<PathBuf>) -> Self {
        match tool {
            Tool::Adb => self.adb_override = path,
            Tool::Scrcpy => self.scrcpy_override = path,
        }
        self
    }

    /// Search this path list instead of the process `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    fn override_for(&self, tool: Tool) -> Option<&PathBuf> {
        match tool {
            Tool::Adb => self.adb_override.as_ref(),
            Tool::Scrcpy => self.scrcpy_override.as_ref(),
        }
    }

    /// Find the binary for `tool` or report every location that was checked
    pub fn find(&self, tool: Tool) -> Result<PathBuf, DriverError> {
        let mut checked_paths = Vec::new();

        if let Some(path) = self.override_for(tool) {
            checked_paths.push(format!("Override: {:?}", path));
            if path.is_file() {
                return Ok(path.clone());
            }
        }

        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        checked_paths.push(format!(
            "Search path: {}",
            search_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| "<unset>".to_string())
        ));

        match which::which_in(tool.binary_name(), search_path, cwd) {
            Ok(path) => {
                log::debug!("Resolved {} to {}", tool, path.display());
                Ok(path)
            }
            Err(_) => Err(DriverError::BinaryNotFound {
                tool,
                checked: checked_paths,
            }),
        }
    }
}
