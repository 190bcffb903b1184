use std::io;
use std::time::Duration;

use thiserror::Error;

use super::command::{CommandResult, CommandSpec, Tool};

/// Why a driver operation did not succeed. Every variant is recoverable.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{tool} not found. Checked:\n{}", checked.join("\n"))]
    BinaryNotFound { tool: Tool, checked: Vec<String> },

    #[error("`{command}` exited with code {}: {}", result.exit_code, result.output())]
    NonZeroExit {
        command: CommandSpec,
        result: CommandResult,
    },

    #[error("`{command}` reported failure: {}", result.output())]
    UnexpectedOutput {
        command: CommandSpec,
        result: CommandResult,
    },

    #[error("`{command}` timed out after {}s", after.as_secs())]
    TimedOut { command: CommandSpec, after: Duration },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: Tool,
        #[source]
        source: io::Error,
    },
}

impl DriverError {
    /// Raw process output worth showing next to the message, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            DriverError::NonZeroExit { result, .. }
            | DriverError::UnexpectedOutput { result, .. } => {
                Some(result.output()).filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }

    /// Short text for the session log
    pub fn user_message(&self) -> String {
        match self {
            DriverError::BinaryNotFound { tool: Tool::Adb, .. } => {
                "adb not found in PATH. Install platform-tools and ensure 'adb' is in PATH."
                    .to_string()
            }
            DriverError::BinaryNotFound {
                tool: Tool::Scrcpy, ..
            } => "scrcpy not found in PATH. Install scrcpy and ensure it is in PATH.".to_string(),
            DriverError::NonZeroExit { command, .. }
            | DriverError::UnexpectedOutput { command, .. } => {
                match command.args.first().map(String::as_str) {
                    Some("pair") => "Pairing failed. Check the pairing code and try again.",
                    Some("connect") => {
                        "adb connect failed. Ensure Wireless debugging is ON and same Wi-Fi."
                    }
                    _ => return format!("`{}` failed.", command),
                }
                .to_string()
            }
            DriverError::TimedOut { command, .. } => match command.args.first().map(String::as_str)
            {
                Some("pair") => "Pairing timed out. Please try again.".to_string(),
                Some("connect") => "Connection timed out. Please try again.".to_string(),
                _ => format!("`{}` timed out.", command),
            },
            DriverError::InvalidInput(msg) => msg.clone(),
            DriverError::Spawn { tool, source } => format!("Failed to start {}: {}", tool, source),
        }
    }
}
