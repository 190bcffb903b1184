use std::fmt;

/// External binaries driven by this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Adb,
    Scrcpy,
}

impl Tool {
    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::Adb => "adb",
            Tool::Scrcpy => "scrcpy",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// A command line for one of the external tools, before path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(tool: Tool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `adb pair <ip>:<port> <code>`
    pub fn pair(ip: &str, port: u16, code: &str) -> Self {
        Self::new(
            Tool::Adb,
            ["pair".to_string(), endpoint(ip, port), code.to_string()],
        )
    }

    /// `adb connect <ip>:<port>`
    pub fn connect(ip: &str, port: u16) -> Self {
        Self::new(Tool::Adb, ["connect".to_string(), endpoint(ip, port)])
    }

    /// `scrcpy -s <serial> --stay-awake`
    pub fn mirror(serial: &str) -> Self {
        Self::new(Tool::Scrcpy, ["-s", serial, "--stay-awake"])
    }

    pub fn devices() -> Self {
        Self::new(Tool::Adb, ["devices"])
    }

    pub fn version() -> Self {
        Self::new(Tool::Adb, ["version"])
    }

    pub fn start_server() -> Self {
        Self::new(Tool::Adb, ["start-server"])
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// `ip:port` serial as understood by adb and scrcpy
pub fn endpoint(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Captured outcome of a finished external process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stdout, falling back to stderr when stdout is empty
    pub fn output(&self) -> &str {
        let stdout = self.stdout.trim();
        if stdout.is_empty() {
            self.stderr.trim()
        } else {
            stdout
        }
    }

    pub fn output_contains(&self, marker: &str) -> bool {
        self.output()
            .to_lowercase()
            .contains(&marker.to_lowercase())
    }
}
