//! External command execution.
//!
//! Every call to `docker` or `tmux` goes through [`CommandRunner`], so the
//! parsers and assemblers can be driven by canned output in tests. The
//! system runner puts a deadline on each call and kills the child when the
//! deadline passes.

use crate::{Error, Result};
use futures::future::BoxFuture;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default per-call deadline for external commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout followed by stderr, like `2>&1` for commands that log to both.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}{}", self.stdout, self.stderr)
        }
    }
}

/// Runs an external program and captures its output.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`. Fails when the binary is missing, exits
    /// non-zero or misses the deadline.
    fn output<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> BoxFuture<'a, Result<CommandOutput>>;

    /// Run and return stdout only.
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Ok(self.output(program, args).await?.stdout) })
    }
}

/// Runs commands on the local host through `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandRunner for SystemRunner {
    fn output<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            let display = display_command(program, args);

            let mut cmd = Command::new(program);
            cmd.args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
                Err(_) => return Err(Error::CommandTimeout(display)),
                Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(Error::ToolUnavailable(program.to_string()));
                }
                Ok(Err(e)) => return Err(Error::Io(e)),
                Ok(Ok(output)) => output,
            };

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            if !output.status.success() {
                return Err(Error::CommandFailed {
                    command: display,
                    status: output.status.code().unwrap_or(-1),
                    stderr: stderr.trim().to_string(),
                    stdout,
                });
            }

            Ok(CommandOutput { stdout, stderr })
        })
    }
}

/// Render a command line for log and error messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Whether an error means the tool itself is absent, as opposed to failing.
pub fn is_unavailable(err: &Error) -> bool {
    matches!(err, Error::ToolUnavailable(_))
}
