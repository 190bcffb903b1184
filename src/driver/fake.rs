//! Recording [`CommandRunner`] used by tests in place of real processes.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::command::{CommandResult, Tool};
use super::runner::{CommandRunner, DetachedProcess, RunError};
use crate::utils::binary_resolver::BinaryResolver;

#[derive(Debug, Clone)]
enum Reply {
    Finished(CommandResult),
    TimedOut,
}

#[derive(Debug, Default)]
pub struct FakeRunner {
    replies: Mutex<HashMap<String, Reply>>,
    detached_exit: Mutex<Option<i32>>,
    calls: Mutex<Vec<String>>,
    spawned: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver whose binaries always exist, pointing at the test executable
    pub fn resolver() -> BinaryResolver {
        let exe = std::env::current_exe().unwrap();
        BinaryResolver::new()
            .with_search_path("/nonexistent-adb-qr-mirror-dir")
            .with_override(Tool::Adb, Some(exe.clone()))
            .with_override(Tool::Scrcpy, Some(exe))
    }

    /// Reply to commands whose first argument is `subcommand`
    pub fn reply(&self, subcommand: &str, exit_code: i32, stdout: &str) {
        self.replies.lock().unwrap().insert(
            subcommand.to_string(),
            Reply::Finished(CommandResult {
                exit_code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
    }

    pub fn reply_timeout(&self, subcommand: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), Reply::TimedOut);
    }

    /// Detached processes report this exit code as soon as they are spawned
    pub fn exit_detached_with(&self, exit_code: i32) {
        *self.detached_exit.lock().unwrap() = Some(exit_code);
    }

    /// Arguments of every completed command, joined by spaces
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spawned(&self) -> Vec<String> {
        self.spawned.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn output(
        &self,
        _program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, RunError> {
        self.calls.lock().unwrap().push(args.join(" "));
        let reply = args
            .first()
            .and_then(|sub| self.replies.lock().unwrap().get(sub).cloned());
        match reply {
            Some(Reply::Finished(result)) => Ok(result),
            Some(Reply::TimedOut) => Err(RunError::TimedOut(
                timeout.unwrap_or(Duration::from_secs(10)),
            )),
            None => Ok(CommandResult::default()),
        }
    }

    fn spawn_detached(
        &self,
        _program: &Path,
        args: &[String],
    ) -> io::Result<Box<dyn DetachedProcess>> {
        self.spawned.lock().unwrap().push(args.join(" "));
        Ok(Box::new(FakeProcess {
            exit_code: *self.detached_exit.lock().unwrap(),
        }))
    }
}

#[derive(Debug)]
struct FakeProcess {
    exit_code: Option<i32>,
}

impl DetachedProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        self.exit_code.is_none().then_some(4242)
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self.exit_code)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.exit_code = Some(-1);
        Ok(())
    }
}
